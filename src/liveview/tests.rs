use super::wire::{read_frame, LENGTH_PREFIX_LEN};
use super::*;
use crate::config::LiveViewConfig;
use crate::driver::{Driver, DriverHandle, SimulatedControl, SimulatedDriver};
use crate::error::{DriverError, LiveViewError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn test_config(port: u16) -> LiveViewConfig {
    LiveViewConfig {
        ip: "127.0.0.1".to_string(),
        port,
        max_fps: 200,
        write_timeout_ms: 1000,
    }
}

fn create_test_server() -> (LiveViewServer, DriverHandle, SimulatedControl) {
    let mut driver = SimulatedDriver::new();
    driver.init().unwrap();
    let control = driver.control();
    let handle = DriverHandle::new(driver);
    let server = LiveViewServer::new(test_config(0), handle.clone());
    (server, handle, control)
}

fn create_server_with(
    mut driver: SimulatedDriver,
    config: LiveViewConfig,
) -> (LiveViewServer, DriverHandle) {
    driver.init().unwrap();
    let handle = DriverHandle::new(driver);
    let server = LiveViewServer::new(config, handle.clone());
    (server, handle)
}

async fn listening_addr(server: &LiveViewServer) -> SocketAddr {
    let mut status = server.subscribe();
    let status = timeout(WAIT, status.wait_for(|s| s.local_addr.is_some()))
        .await
        .expect("listener never came up")
        .unwrap()
        .clone();
    status.local_addr.unwrap()
}

async fn wait_stopped(server: &LiveViewServer) {
    timeout(WAIT, server.wait_stopped())
        .await
        .expect("live view never stopped");
}

#[tokio::test]
async fn test_stream_frames_to_viewer() {
    let (server, handle, _control) = create_test_server();
    server.start().unwrap();
    let addr = listening_addr(&server).await;
    assert_eq!(server.state(), LiveViewState::Listening);

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    for _ in 0..3 {
        let frame = timeout(WAIT, read_frame(&mut viewer))
            .await
            .unwrap()
            .unwrap()
            .expect("stream closed early");
        assert_eq!(&frame[..2], &[0xFF, 0xD8]);
        assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);
    }
    assert!(handle.is_held());

    assert!(server.stop());
    wait_stopped(&server).await;

    // Drain whatever was in flight, then the socket must close
    loop {
        match timeout(WAIT, read_frame(&mut viewer)).await.unwrap() {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
    assert!(!handle.is_held());

    let status = server.status();
    assert!(status.frames_sent >= 3);
    assert!(status.local_addr.is_none());
    assert!(status.peer_addr.is_none());
}

#[tokio::test]
async fn test_length_prefix_is_native_endian() {
    let (server, _handle, _control) = create_test_server();
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    let mut header = [0u8; LENGTH_PREFIX_LEN];
    timeout(WAIT, viewer.read_exact(&mut header))
        .await
        .unwrap()
        .unwrap();
    let len = u32::from_ne_bytes(header) as usize;

    let mut body = vec![0u8; len];
    timeout(WAIT, viewer.read_exact(&mut body))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&body[..2], &[0xFF, 0xD8]);

    server.shutdown().await;
    assert_eq!(server.state(), LiveViewState::Stopped);
}

#[tokio::test]
async fn test_double_start_is_rejected() {
    let (server, _handle, _control) = create_test_server();
    server.start().unwrap();
    assert!(matches!(server.start(), Err(LiveViewError::AlreadyRunning)));
    server.shutdown().await;
}

#[tokio::test]
async fn test_stop_before_viewer_connects() {
    let (server, handle, _control) = create_test_server();
    server.start().unwrap();
    listening_addr(&server).await;
    assert!(handle.is_held());

    assert!(server.stop());
    wait_stopped(&server).await;
    assert!(!handle.is_held());
    assert_eq!(server.status().frames_sent, 0);
}

#[tokio::test]
async fn test_driver_is_busy_during_session() {
    let (server, handle, _control) = create_test_server();
    server.start().unwrap();

    let err = handle.run(|d| d.camera_present()).await.unwrap_err();
    assert_eq!(err, DriverError::Busy);

    server.shutdown().await;
    assert!(handle.run(|d| d.camera_present()).await.unwrap());
}

#[tokio::test]
async fn test_start_fails_when_driver_is_held() {
    let (server, handle, _control) = create_test_server();
    let _guard = handle.try_acquire().unwrap();

    let err = server.start().unwrap_err();
    assert!(matches!(err, LiveViewError::Driver(DriverError::Busy)));
    assert_eq!(server.state(), LiveViewState::Stopped);
}

#[tokio::test]
async fn test_preview_failure_ends_session() {
    let (server, handle, control) = create_test_server();
    control.fail_preview_after(2);
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    let mut frames = 0;
    while let Some(_) = timeout(WAIT, read_frame(&mut viewer)).await.unwrap().unwrap() {
        frames += 1;
    }
    assert_eq!(frames, 2);

    wait_stopped(&server).await;
    assert!(!handle.is_held());
}

#[tokio::test]
async fn test_empty_frames_are_skipped() {
    let (server, _handle, control) = create_test_server();
    control.empty_preview_every(2);
    control.fail_preview_after(4);
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = timeout(WAIT, read_frame(&mut viewer)).await.unwrap().unwrap() {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|f| !f.is_empty()));
    wait_stopped(&server).await;
    assert_eq!(server.status().frames_sent, 4);
}

#[tokio::test]
async fn test_viewer_disconnect_allows_restart() {
    let (server, handle, _control) = create_test_server();
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    timeout(WAIT, read_frame(&mut viewer))
        .await
        .unwrap()
        .unwrap();
    drop(viewer);

    wait_stopped(&server).await;
    assert!(!handle.is_held());

    server.start().unwrap();
    let addr = listening_addr(&server).await;
    let mut viewer = TcpStream::connect(addr).await.unwrap();
    let frame = timeout(WAIT, read_frame(&mut viewer))
        .await
        .unwrap()
        .unwrap();
    assert!(frame.is_some());
    server.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_stops_worker() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let (server, handle) = create_server_with(SimulatedDriver::new(), test_config(port));

    server.start().unwrap();
    wait_stopped(&server).await;
    assert!(!handle.is_held());
    assert!(server.status().local_addr.is_none());
}

#[tokio::test]
async fn test_stop_takes_effect_within_one_frame_interval() {
    let config = LiveViewConfig {
        max_fps: 20,
        write_timeout_ms: 5000,
        ..test_config(0)
    };
    let interval = config.frame_interval();
    let (server, handle) = create_server_with(SimulatedDriver::new(), config);
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    let mut viewer = TcpStream::connect(addr).await.unwrap();
    for _ in 0..2 {
        timeout(WAIT, read_frame(&mut viewer))
            .await
            .unwrap()
            .unwrap()
            .expect("stream closed early");
    }

    let stopping = Instant::now();
    assert!(server.stop());
    wait_stopped(&server).await;
    let elapsed = stopping.elapsed();
    assert!(
        elapsed < interval + Duration::from_millis(250),
        "stop took {:?} with a {:?} frame interval",
        elapsed,
        interval
    );
    assert!(!handle.is_held());

    // Every frame that made it out is whole, then the stream ends cleanly
    loop {
        match timeout(WAIT, read_frame(&mut viewer)).await.unwrap() {
            Ok(Some(frame)) => assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]),
            Ok(None) => break,
            Err(e) => panic!("viewer saw a torn frame: {}", e),
        }
    }
}

#[tokio::test]
async fn test_stop_preempts_stalled_write() {
    let config = LiveViewConfig {
        write_timeout_ms: 10_000,
        ..test_config(0)
    };
    let interval = config.frame_interval();
    let driver = SimulatedDriver::new().with_preview_size(1024 * 1024);
    let (server, handle) = create_server_with(driver, config);
    server.start().unwrap();
    let addr = listening_addr(&server).await;

    // Connected but never reading, so the socket buffers fill up
    let _viewer = TcpStream::connect(addr).await.unwrap();
    let mut status = server.subscribe();
    timeout(WAIT, status.wait_for(|s| s.frames_sent > 0))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.state(), LiveViewState::Streaming);

    let stopping = Instant::now();
    assert!(server.stop());
    wait_stopped(&server).await;
    let elapsed = stopping.elapsed();
    assert!(
        elapsed < interval + Duration::from_secs(1),
        "stalled write held stop for {:?}",
        elapsed
    );
    assert!(!handle.is_held());
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let (server, _handle, _control) = create_test_server();
    assert!(!server.stop());
    assert!(!server.is_running());
    server.shutdown().await;
}

#[test]
fn test_start_outside_runtime_fails() {
    let (server, handle, _control) = create_test_server();
    assert!(matches!(server.start(), Err(LiveViewError::Spawn { .. })));
    assert!(!handle.is_held());
}
