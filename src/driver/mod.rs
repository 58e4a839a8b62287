//! Boundary to the vendor camera driver.
//!
//! The driver owns the device protocol; everything in this crate talks to it
//! through [`Driver`] and reads its configuration graph through [`Widget`].
//! Widget values are only ever read through the accessor matching the
//! widget's type.

mod handle;
mod simulated;

pub use handle::{CameraContext, DriverGuard, DriverHandle};
pub use simulated::{SimulatedControl, SimulatedDriver, SimulatedWidget};

use crate::error::DriverError;
use std::fmt;
use std::time::Duration;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Native widget types reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetType {
    Window,
    Section,
    Text,
    Range,
    Toggle,
    Radio,
    Menu,
    Button,
    Date,
}

/// A value written into a widget
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetValue {
    Text(String),
    Toggle(bool),
    Range(f32),
}

/// Location of a file on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub folder: String,
    pub name: String,
}

impl RemoteFile {
    pub fn new<S: Into<String>>(folder: S, name: S) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder.ends_with('/') {
            write!(f, "{}{}", self.folder, self.name)
        } else {
            write!(f, "{}/{}", self.folder, self.name)
        }
    }
}

/// Events the driver reports out-of-band from data transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    Unknown,
    Timeout,
    FileAdded(RemoteFile),
    FolderAdded(String),
    CaptureComplete,
}

/// One node of the driver's configuration graph
pub trait Widget: Send + fmt::Debug {
    fn name(&self) -> &str;

    fn label(&self) -> &str;

    fn id(&self) -> i32;

    fn widget_type(&self) -> WidgetType;

    fn child_count(&self) -> usize;

    fn child(&self, index: usize) -> Option<&dyn Widget>;

    /// Look up a descendant by name, the way the driver resolves names
    fn child_by_name_mut(&mut self, name: &str) -> Option<&mut dyn Widget>;

    /// Choices of a radio or menu widget, in driver order
    fn choices(&self) -> Vec<String>;

    fn text_value(&self) -> DriverResult<String>;

    fn toggle_value(&self) -> DriverResult<bool>;

    fn range_value(&self) -> DriverResult<f32>;

    /// `(min, max, step)` of a range widget
    fn range_bounds(&self) -> DriverResult<(f32, f32, f32)>;

    fn is_readonly(&self) -> bool {
        false
    }

    fn set_value(&mut self, value: WidgetValue) -> DriverResult<()>;
}

/// Blocking interface to a single attached camera
pub trait Driver: Send {
    /// Open or reopen the device
    fn init(&mut self) -> DriverResult<()>;

    fn camera_present(&self) -> bool;

    /// Fetch a fresh copy of the full configuration graph
    fn get_config_tree(&mut self) -> DriverResult<Box<dyn Widget>>;

    /// Commit a modified configuration graph back to the device
    fn set_config(&mut self, root: &dyn Widget) -> DriverResult<()>;

    /// Trigger one exposure and report where the device stored it
    fn capture_still(&mut self, folder: &str, name: &str) -> DriverResult<RemoteFile>;

    fn retrieve_file(&mut self, file: &RemoteFile) -> DriverResult<Vec<u8>>;

    fn delete_remote_file(&mut self, file: &RemoteFile) -> DriverResult<()>;

    /// Fetch one JPEG preview frame; may be empty when none is ready
    fn fetch_preview_frame(&mut self) -> DriverResult<Vec<u8>>;

    fn poll_event(&mut self, timeout: Duration) -> DriverResult<CameraEvent>;
}

/// Driver used when no camera is attached
#[derive(Debug, Default)]
pub struct DisconnectedDriver;

impl Driver for DisconnectedDriver {
    fn init(&mut self) -> DriverResult<()> {
        Err(DriverError::NotFound)
    }

    fn camera_present(&self) -> bool {
        false
    }

    fn get_config_tree(&mut self) -> DriverResult<Box<dyn Widget>> {
        Err(DriverError::NotFound)
    }

    fn set_config(&mut self, _root: &dyn Widget) -> DriverResult<()> {
        Err(DriverError::NotFound)
    }

    fn capture_still(&mut self, _folder: &str, _name: &str) -> DriverResult<RemoteFile> {
        Err(DriverError::NotFound)
    }

    fn retrieve_file(&mut self, _file: &RemoteFile) -> DriverResult<Vec<u8>> {
        Err(DriverError::NotFound)
    }

    fn delete_remote_file(&mut self, _file: &RemoteFile) -> DriverResult<()> {
        Err(DriverError::NotFound)
    }

    fn fetch_preview_frame(&mut self) -> DriverResult<Vec<u8>> {
        Err(DriverError::NotFound)
    }

    fn poll_event(&mut self, _timeout: Duration) -> DriverResult<CameraEvent> {
        Err(DriverError::NotFound)
    }
}
