use super::session::CaptureSession;
use crate::config::CaptureConfig;
use crate::driver::{CameraEvent, Driver, WidgetValue};
use crate::error::{CaptureError, SettingsError};
use crate::settings::ConfigSync;
use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Outcome of draining driver events after an exposure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub events: u32,
    pub completions: u32,
    pub hit_limit: bool,
}

/// Runs single exposures and bursts against the driver
#[derive(Debug)]
pub struct CaptureController {
    config: CaptureConfig,
    autofocus_drive: String,
    sequence: AtomicU64,
}

impl CaptureController {
    pub fn new<S: Into<String>>(config: CaptureConfig, autofocus_drive: S) -> Self {
        Self {
            config,
            autofocus_drive: autofocus_drive.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn next_filename(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{}-{}-{:04}.jpg",
            self.config.filename_prefix,
            Local::now().format("%Y%m%d-%H%M%S%.3f"),
            sequence
        )
    }

    /// Trigger one exposure, fetch its bytes and wait for the device to settle
    pub fn capture(&self, driver: &mut dyn Driver) -> Result<CaptureSession, CaptureError> {
        let mut session = CaptureSession::new(self.next_filename());
        debug!("Triggering exposure for {}", session.filename);

        let file = driver
            .capture_still(&self.config.folder, &session.filename)
            .map_err(CaptureError::Trigger)?;

        session.data = driver
            .retrieve_file(&file)
            .map_err(|source| CaptureError::Retrieve {
                path: file.to_string(),
                source,
            })?;

        // The bytes are already local; a leftover file on the card is tolerable
        if let Err(e) = driver.delete_remote_file(&file) {
            warn!("Failed to delete {} from the camera: {}", file, e);
        }

        let summary = self.drain_events(driver);
        debug!(
            "Drained {} events ({} completions) after {}",
            summary.events, summary.completions, file
        );

        info!("Captured {} ({} bytes)", file, session.data.len());
        session.remote = Some(file);
        session.success = true;
        Ok(session)
    }

    /// Poll until the device reports a timeout, i.e. it has gone quiet
    pub fn drain_events(&self, driver: &mut dyn Driver) -> DrainSummary {
        let mut summary = DrainSummary::default();
        let mut timeout = self.config.event_timeout();

        loop {
            if summary.events >= self.config.max_drain_events {
                warn!(
                    "Stopped draining camera events after {} events",
                    summary.events
                );
                summary.hit_limit = true;
                break;
            }

            let event = match driver.poll_event(timeout) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Failed to poll camera events: {}", e);
                    break;
                }
            };

            match event {
                CameraEvent::Timeout => break,
                CameraEvent::CaptureComplete | CameraEvent::FileAdded(_) => {
                    summary.completions += 1;
                    timeout = self.config.settle_timeout();
                }
                CameraEvent::Unknown => {}
                other => warn!("Unexpected event received from camera: {:?}", other),
            }
            summary.events += 1;
        }

        summary
    }

    /// Capture `count` stills; any failed exposure fails the whole burst
    pub fn burst(
        &self,
        driver: &mut dyn Driver,
        count: usize,
    ) -> Result<Vec<CaptureSession>, CaptureError> {
        if count > self.config.max_burst {
            return Err(CaptureError::BurstTooLarge {
                requested: count,
                limit: self.config.max_burst,
            });
        }

        info!("Starting burst of {} captures", count);
        let mut sessions = Vec::with_capacity(count);
        for index in 0..count {
            let session = self.capture(driver).map_err(|e| CaptureError::Burst {
                index,
                source: Box::new(e),
            })?;
            sessions.push(session);
        }
        Ok(sessions)
    }

    /// Nudge the focus drive setting one step forward
    pub fn autofocus(
        &self,
        driver: &mut dyn Driver,
        sync: &ConfigSync,
    ) -> Result<WidgetValue, SettingsError> {
        debug!("Driving autofocus through '{}'", self.autofocus_drive);
        sync.step(driver, &self.autofocus_drive)
    }
}
