use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CamctlConfig {
    pub driver: DriverConfig,
    pub liveview: LiveViewConfig,
    pub capture: CaptureConfig,
    pub api: ApiConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// In-memory camera
    Simulated,
    /// No camera attached
    None,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverConfig {
    #[serde(default = "default_driver_kind")]
    pub kind: DriverKind,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LiveViewConfig {
    /// IP address to bind to
    #[serde(default = "default_liveview_ip")]
    pub ip: String,

    /// Port to listen on (0 picks a free port)
    #[serde(default = "default_liveview_port")]
    pub port: u16,

    /// Upper bound on frames sent per second
    #[serde(default = "default_liveview_max_fps")]
    pub max_fps: u32,

    /// Longest a single frame write may stall before the viewer is dropped
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Device folder the still is written to
    #[serde(default = "default_capture_folder")]
    pub folder: String,

    /// Prefix for generated still file names
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    /// Poll timeout while waiting for the first completion event
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,

    /// Poll timeout once the device reported completion
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// Hard cap on events drained after one exposure
    #[serde(default = "default_max_drain_events")]
    pub max_drain_events: u32,

    /// Largest burst accepted in one request
    #[serde(default = "default_max_burst")]
    pub max_burst: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Xml,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Default envelope format
    #[serde(default = "default_output_format")]
    pub output: OutputFormat,

    /// Optional TOML message catalog replacing the built-in messages
    #[serde(default)]
    pub messages_file: Option<String>,
}

/// Driver widget names behind each API setter
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SettingsConfig {
    #[serde(default = "default_root_group")]
    pub root_group: String,
    #[serde(default = "default_focus_point")]
    pub focus_point: String,
    #[serde(default = "default_aperture")]
    pub aperture: String,
    #[serde(default = "default_speed")]
    pub speed: String,
    #[serde(default = "default_iso")]
    pub iso: String,
    #[serde(default = "default_whitebalance")]
    pub whitebalance: String,
    #[serde(default = "default_autofocus_drive")]
    pub autofocus_drive: String,
}

impl LiveViewConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000u64 / self.max_fps.max(1) as u64)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl CaptureConfig {
    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

impl CamctlConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camctl.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("driver.kind", "simulated")?
            .set_default("liveview.ip", default_liveview_ip())?
            .set_default("liveview.port", default_liveview_port())?
            .set_default("liveview.max_fps", default_liveview_max_fps())?
            .set_default("liveview.write_timeout_ms", default_write_timeout_ms())?
            .set_default("capture.folder", default_capture_folder())?
            .set_default("capture.filename_prefix", default_filename_prefix())?
            .set_default("capture.event_timeout_ms", default_event_timeout_ms())?
            .set_default("capture.settle_timeout_ms", default_settle_timeout_ms())?
            .set_default("capture.max_drain_events", default_max_drain_events())?
            .set_default("capture.max_burst", default_max_burst() as i64)?
            .set_default("api.output", "json")?
            .set_default("settings.root_group", default_root_group())?
            .set_default("settings.focus_point", default_focus_point())?
            .set_default("settings.aperture", default_aperture())?
            .set_default("settings.speed", default_speed())?
            .set_default("settings.iso", default_iso())?
            .set_default("settings.whitebalance", default_whitebalance())?
            .set_default("settings.autofocus_drive", default_autofocus_drive())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables, e.g. CAMCTL_LIVEVIEW__PORT=6000
            .add_source(
                Environment::with_prefix("CAMCTL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CamctlConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liveview.ip.trim().is_empty() {
            return Err(ConfigError::Message(
                "Live view ip must not be empty".to_string(),
            ));
        }

        if self.liveview.max_fps == 0 {
            return Err(ConfigError::Message(
                "Live view max_fps must be greater than 0".to_string(),
            ));
        }

        if self.liveview.write_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Live view write_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.capture.event_timeout_ms == 0 || self.capture.settle_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Capture event timeouts must be greater than 0".to_string(),
            ));
        }

        if self.capture.max_drain_events == 0 {
            return Err(ConfigError::Message(
                "Capture max_drain_events must be greater than 0".to_string(),
            ));
        }

        if self.capture.filename_prefix.contains('/') {
            return Err(ConfigError::Message(
                "Capture filename_prefix must not contain '/'".to_string(),
            ));
        }

        let names = [
            ("root_group", &self.settings.root_group),
            ("focus_point", &self.settings.focus_point),
            ("aperture", &self.settings.aperture),
            ("speed", &self.settings.speed),
            ("iso", &self.settings.iso),
            ("whitebalance", &self.settings.whitebalance),
            ("autofocus_drive", &self.settings.autofocus_drive),
        ];
        for (key, name) in names {
            if name.is_empty() {
                return Err(ConfigError::Message(format!(
                    "Setting name '{}' must not be empty",
                    key
                )));
            }
            if key != "root_group" && name.contains('.') {
                return Err(ConfigError::Message(format!(
                    "Setting name '{}' must be a single segment, got '{}'",
                    key, name
                )));
            }
        }

        Ok(())
    }
}

impl Default for CamctlConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig {
                kind: default_driver_kind(),
            },
            liveview: LiveViewConfig {
                ip: default_liveview_ip(),
                port: default_liveview_port(),
                max_fps: default_liveview_max_fps(),
                write_timeout_ms: default_write_timeout_ms(),
            },
            capture: CaptureConfig {
                folder: default_capture_folder(),
                filename_prefix: default_filename_prefix(),
                event_timeout_ms: default_event_timeout_ms(),
                settle_timeout_ms: default_settle_timeout_ms(),
                max_drain_events: default_max_drain_events(),
                max_burst: default_max_burst(),
            },
            api: ApiConfig {
                output: default_output_format(),
                messages_file: None,
            },
            settings: SettingsConfig {
                root_group: default_root_group(),
                focus_point: default_focus_point(),
                aperture: default_aperture(),
                speed: default_speed(),
                iso: default_iso(),
                whitebalance: default_whitebalance(),
                autofocus_drive: default_autofocus_drive(),
            },
        }
    }
}

// Default value functions
fn default_driver_kind() -> DriverKind {
    DriverKind::Simulated
}

fn default_liveview_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_liveview_port() -> u16 {
    5001
}
fn default_liveview_max_fps() -> u32 {
    30
}
fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_capture_folder() -> String {
    "/".to_string()
}
fn default_filename_prefix() -> String {
    "capture".to_string()
}
fn default_event_timeout_ms() -> u64 {
    500
}
fn default_settle_timeout_ms() -> u64 {
    100
}
fn default_max_drain_events() -> u32 {
    64
}
fn default_max_burst() -> usize {
    50
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Json
}

fn default_root_group() -> String {
    "main".to_string()
}
fn default_focus_point() -> String {
    "d108".to_string()
}
fn default_aperture() -> String {
    "f-number".to_string()
}
fn default_speed() -> String {
    "shutterspeed".to_string()
}
fn default_iso() -> String {
    "iso".to_string()
}
fn default_whitebalance() -> String {
    "whitebalance".to_string()
}
fn default_autofocus_drive() -> String {
    "autofocusdrive".to_string()
}
