use super::{Driver, DriverResult};
use crate::error::DriverError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Exclusive ownership of the driver, held for a whole live view session
pub type DriverGuard = OwnedMutexGuard<Box<dyn Driver>>;

/// Shared handle to the single driver instance.
///
/// Callers never queue on the lock: a held driver is reported as
/// [`DriverError::Busy`] instead.
#[derive(Clone)]
pub struct DriverHandle {
    inner: Arc<Mutex<Box<dyn Driver>>>,
}

impl DriverHandle {
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    pub fn from_boxed(driver: Box<dyn Driver>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    pub fn try_acquire(&self) -> DriverResult<DriverGuard> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| DriverError::Busy)
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Run a blocking driver call on the blocking pool
    pub async fn run<F, R>(&self, f: F) -> DriverResult<R>
    where
        F: FnOnce(&mut dyn Driver) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.try_acquire()?;
        tokio::task::spawn_blocking(move || f(&mut **guard))
            .await
            .map_err(|e| DriverError::Worker {
                details: e.to_string(),
            })
    }
}

/// Explicitly constructed camera context shared by every component
pub struct CameraContext {
    driver: DriverHandle,
    present: AtomicBool,
}

impl CameraContext {
    /// Check the driver once and remember whether a camera answered
    pub async fn open(driver: DriverHandle) -> Self {
        let present = detect_camera(&driver).await.unwrap_or_else(|e| {
            warn!("Camera detection failed: {}", e);
            false
        });

        if present {
            info!("Camera detected");
        } else {
            warn!("No camera detected; commands will report camera not found");
        }

        Self {
            driver,
            present: AtomicBool::new(present),
        }
    }

    pub fn camera_found(&self) -> bool {
        self.present.load(Ordering::Acquire)
    }

    pub fn driver(&self) -> &DriverHandle {
        &self.driver
    }

    /// Re-detect the camera without restarting the process
    pub async fn reinitialize(&self) -> DriverResult<bool> {
        info!("Re-initializing camera driver");
        let present = detect_camera(&self.driver).await?;
        self.present.store(present, Ordering::Release);
        debug!("Camera present after re-initialization: {}", present);
        Ok(present)
    }
}

async fn detect_camera(driver: &DriverHandle) -> DriverResult<bool> {
    driver
        .run(|d| match d.init() {
            Ok(()) => Ok(d.camera_present()),
            Err(DriverError::NotFound) => Ok(false),
            Err(e) => Err(e),
        })
        .await?
}
