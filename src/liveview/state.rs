use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;

/// Live view lifecycle states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveViewState {
    #[default]
    Stopped,
    Starting,
    Listening,
    Streaming,
    Stopping,
}

impl fmt::Display for LiveViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Listening => "listening",
            Self::Streaming => "streaming",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Snapshot of the current live view session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveViewStatus {
    pub state: LiveViewState,
    pub local_addr: Option<SocketAddr>,
    pub peer_addr: Option<SocketAddr>,
    pub frames_sent: u64,
    pub bytes_sent: u64,
}

impl LiveViewStatus {
    pub fn is_stopped(&self) -> bool {
        self.state == LiveViewState::Stopped
    }
}
