mod controller;
mod session;

pub use controller::{CaptureController, DrainSummary};
pub use session::CaptureSession;
