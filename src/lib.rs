pub mod api;
pub mod capture;
pub mod config;
pub mod driver;
pub mod error;
pub mod liveview;
pub mod settings;
pub mod tree;

pub use api::{Api, Command, LiveViewAction, MessageCatalog, Response, ResponseState};
pub use capture::{CaptureController, CaptureSession};
pub use config::CamctlConfig;
pub use driver::{CameraContext, Driver, DriverHandle, SimulatedDriver};
pub use error::{CamctlError, ResponseCode, Result};
pub use liveview::{LiveViewServer, LiveViewState, LiveViewStatus};
pub use settings::ConfigSync;
pub use tree::{ConfigKind, ConfigNode, LeafValue, NodeBody};
