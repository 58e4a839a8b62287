//! Live preview streaming to a single TCP viewer.
//!
//! Each frame on the wire is a native-endian `u32` length followed by that
//! many bytes of JPEG data.

mod server;
mod state;
pub mod wire;
#[cfg(test)]
mod tests;

pub use server::LiveViewServer;
pub use state::{LiveViewState, LiveViewStatus};
