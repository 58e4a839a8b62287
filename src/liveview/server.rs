use super::state::{LiveViewState, LiveViewStatus};
use super::wire::write_frame;
use crate::config::LiveViewConfig;
use crate::driver::{DriverGuard, DriverHandle};
use crate::error::LiveViewError;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

struct LiveViewSession {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Owns the live view lifecycle: listener, single viewer, frame loop.
///
/// While a session is alive it holds the driver exclusively; every other
/// driver user sees the camera as busy until the session has stopped.
pub struct LiveViewServer {
    config: LiveViewConfig,
    driver: DriverHandle,
    status: Arc<watch::Sender<LiveViewStatus>>,
    session: Mutex<Option<LiveViewSession>>,
}

impl LiveViewServer {
    pub fn new(config: LiveViewConfig, driver: DriverHandle) -> Self {
        let (status, _) = watch::channel(LiveViewStatus::default());
        Self {
            config,
            driver,
            status: Arc::new(status),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LiveViewConfig {
        &self.config
    }

    pub fn status(&self) -> LiveViewStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> LiveViewState {
        self.status.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() != LiveViewState::Stopped
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveViewStatus> {
        self.status.subscribe()
    }

    /// Spawn the worker. Succeeds once the worker exists, whether or not a
    /// viewer ever connects.
    pub fn start(&self) -> Result<(), LiveViewError> {
        let mut session = self.session.lock();
        if self.is_running() {
            warn!("Live view start rejected: already {}", self.state());
            return Err(LiveViewError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| LiveViewError::Spawn {
            details: e.to_string(),
        })?;
        let guard = self.driver.try_acquire()?;

        self.status.send_replace(LiveViewStatus {
            state: LiveViewState::Starting,
            ..LiveViewStatus::default()
        });

        let cancel = CancellationToken::new();
        let worker = LiveViewWorker {
            config: self.config.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(worker.run(guard));

        *session = Some(LiveViewSession {
            cancel,
            task: Some(task),
        });
        info!("Live view starting on {}", self.config.address());
        Ok(())
    }

    /// Ask the worker to wind down; returns false when nothing was running.
    ///
    /// Sockets are closed by the worker itself once it observes the request.
    pub fn stop(&self) -> bool {
        let session = self.session.lock();
        match session.as_ref() {
            Some(session) if self.is_running() => {
                info!("Live view stop requested");
                session.cancel.cancel();
                true
            }
            _ => {
                debug!("Live view stop requested while stopped");
                false
            }
        }
    }

    /// Wait until the worker has reached `Stopped`
    pub async fn wait_stopped(&self) {
        let mut receiver = self.status.subscribe();
        let _ = receiver.wait_for(LiveViewStatus::is_stopped).await;
    }

    /// Stop the session and join the worker task
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.session.lock().as_mut().and_then(|s| s.task.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Live view worker ended abnormally: {}", e);
            }
        }
    }
}

struct LiveViewWorker {
    config: LiveViewConfig,
    status: Arc<watch::Sender<LiveViewStatus>>,
    cancel: CancellationToken,
}

impl LiveViewWorker {
    fn transition(&self, state: LiveViewState) {
        self.status.send_modify(|status| {
            debug!("Live view {} -> {}", status.state, state);
            status.state = state;
        });
    }

    async fn run(self, guard: DriverGuard) {
        let address = self.config.address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                let e = LiveViewError::Bind { address, source };
                error!("{}", e);
                self.finish(Some(guard), None).await;
                return;
            }
        };

        let local_addr = listener.local_addr().ok();
        self.status.send_modify(|status| status.local_addr = local_addr);
        self.transition(LiveViewState::Listening);
        info!("Live view waiting for a viewer on {}", address);

        let accepted = tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Live view stopped before a viewer connected");
                None
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => Some(pair),
                Err(e) => {
                    error!("Failed to accept live view viewer: {}", e);
                    None
                }
            }
        };
        drop(listener);

        let Some((mut stream, peer)) = accepted else {
            self.finish(Some(guard), None).await;
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            trace!("Could not disable Nagle for {}: {}", peer, e);
        }
        self.status.send_modify(|status| status.peer_addr = Some(peer));
        self.transition(LiveViewState::Streaming);
        info!("Live view streaming to {}", peer);

        let guard = self.stream_frames(guard, &mut stream).await;
        self.finish(guard, Some(stream)).await;
    }

    /// Frame loop; hands the driver back unless its worker thread died
    async fn stream_frames(
        &self,
        mut guard: DriverGuard,
        stream: &mut TcpStream,
    ) -> Option<DriverGuard> {
        let mut ticker = interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let write_timeout = self.config.write_timeout();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::task::spawn_blocking(move || {
                let mut guard = guard;
                let frame = guard.fetch_preview_frame();
                (guard, frame)
            })
            .await;

            let frame = match fetched {
                Ok((returned, frame)) => {
                    guard = returned;
                    frame
                }
                Err(e) => {
                    error!("Preview worker failed: {}", e);
                    return None;
                }
            };

            let frame = match frame {
                Ok(frame) if frame.is_empty() => {
                    trace!("Driver returned an empty preview frame");
                    continue;
                }
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to fetch preview frame: {}", e);
                    break;
                }
            };

            // A frame in flight at stop gets one frame interval to finish
            let write = timeout(write_timeout, write_frame(stream, &frame));
            tokio::pin!(write);
            let raced = tokio::select! {
                written = &mut write => Some(written),
                _ = self.cancel.cancelled() => None,
            };
            let written = match raced {
                Some(written) => written,
                None => match timeout(self.config.frame_interval(), &mut write).await {
                    Ok(written) => written,
                    Err(_) => {
                        debug!("Abandoning stalled frame write on stop");
                        break;
                    }
                },
            };

            match written {
                Ok(Ok(())) => {
                    self.status.send_modify(|status| {
                        status.frames_sent += 1;
                        status.bytes_sent += frame.len() as u64;
                    });
                    trace!("Sent preview frame of {} bytes", frame.len());
                }
                Ok(Err(e)) => {
                    info!("Live view viewer disconnected: {}", LiveViewError::from(e));
                    break;
                }
                Err(_) => {
                    warn!("Live view write stalled for {:?}; dropping viewer", write_timeout);
                    break;
                }
            }
        }

        Some(guard)
    }

    async fn finish(&self, guard: Option<DriverGuard>, stream: Option<TcpStream>) {
        self.transition(LiveViewState::Stopping);

        if let Some(mut stream) = stream {
            if let Err(e) = stream.shutdown().await {
                debug!("Viewer socket shutdown failed: {}", e);
            }
        }
        drop(guard);

        let frames = self.status.borrow().frames_sent;
        self.status.send_modify(|status| {
            status.local_addr = None;
            status.peer_addr = None;
        });
        self.transition(LiveViewState::Stopped);
        info!("Live view stopped after {} frames", frames);
    }
}
