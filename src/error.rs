use thiserror::Error;

/// Failures reported by a camera driver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("No camera detected")]
    NotFound,

    #[error("Camera is busy (held by live view)")]
    Busy,

    #[error("Driver call '{operation}' failed: {details}")]
    Call {
        operation: &'static str,
        details: String,
    },

    #[error("Widget '{name}' has no {accessor} value")]
    WrongAccessor {
        name: String,
        accessor: &'static str,
    },

    #[error("Driver worker failed: {details}")]
    Worker { details: String },
}

impl DriverError {
    pub fn call<S: Into<String>>(operation: &'static str, details: S) -> Self {
        Self::Call {
            operation,
            details: details.into(),
        }
    }
}

/// Failures while synchronizing the settings tree
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Settings group '{name}' not found")]
    GroupNotFound { name: String },

    #[error("Setting '{name}' not found")]
    ChildNotFound { name: String },

    #[error("Nested setting paths are not writable: '{path}'")]
    DeepPath { path: String },

    #[error("Invalid value '{value}' for setting '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Setting '{name}' cannot be written")]
    ReadOnly { name: String },
}

/// Failures of the still capture protocol
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to trigger exposure: {0}")]
    Trigger(DriverError),

    #[error("Failed to retrieve '{path}': {source}")]
    Retrieve { path: String, source: DriverError },

    #[error("Burst aborted at capture {index}: {source}")]
    Burst {
        index: usize,
        #[source]
        source: Box<CaptureError>,
    },

    #[error("Burst of {requested} exceeds the limit of {limit}")]
    BurstTooLarge { requested: usize, limit: usize },
}

/// Failures of the live view lifecycle
#[derive(Error, Debug)]
pub enum LiveViewError {
    #[error("Live view is already running")]
    AlreadyRunning,

    #[error("Failed to spawn live view worker: {details}")]
    Spawn { details: String },

    #[error("Failed to bind live view listener on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Viewer transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Failures parsing a command line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{name}'")]
    Unknown { name: String },

    #[error("Command '{command}' requires an argument")]
    MissingArgument { command: &'static str },

    #[error("Invalid argument '{value}' for command '{command}'")]
    InvalidArgument { command: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum CamctlError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message catalog error: {0}")]
    Catalog(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Camera not found")]
    CameraNotFound,

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Live view error: {0}")]
    LiveView(#[from] LiveViewError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

impl CamctlError {
    /// Collapse any failure into the code shown to API callers
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::CameraNotFound => ResponseCode::CameraNotFound,
            _ => ResponseCode::OperationFailed,
        }
    }
}

/// Numeric codes carried by the response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    CameraNotFound,
    OperationFailed,
}

impl ResponseCode {
    pub fn code(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::CameraNotFound => 1,
            Self::OperationFailed => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, CamctlError>;
