use crate::driver::RemoteFile;
use base64::Engine;

/// State of one exposure, alive until its bytes are handed to the caller
#[derive(Debug, Clone, Default)]
pub struct CaptureSession {
    pub filename: String,
    pub remote: Option<RemoteFile>,
    pub data: Vec<u8>,
    pub success: bool,
}

impl CaptureSession {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Image bytes encoded for a text transport
    pub fn encoded(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}
