//! Command facade: presence check, delegation, envelope.

mod catalog;
mod commands;
mod response;

pub use catalog::{CatalogEntry, MessageCatalog};
pub use commands::{Command, LiveViewAction};
pub use response::{Response, ResponseState};

use crate::capture::CaptureController;
use crate::config::{CamctlConfig, SettingsConfig};
use crate::driver::CameraContext;
use crate::error::{CamctlError, ResponseCode, Result};
use crate::liveview::LiveViewServer;
use crate::settings::ConfigSync;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Entry point for every caller-visible operation.
///
/// No error escapes this type: each command resolves to a [`Response`].
pub struct Api {
    context: Arc<CameraContext>,
    sync: Arc<ConfigSync>,
    capture: Arc<CaptureController>,
    liveview: LiveViewServer,
    catalog: MessageCatalog,
    names: SettingsConfig,
}

impl Api {
    pub fn new(context: Arc<CameraContext>, config: &CamctlConfig, catalog: MessageCatalog) -> Self {
        let liveview = LiveViewServer::new(config.liveview.clone(), context.driver().clone());
        Self {
            sync: Arc::new(ConfigSync::new(config.settings.root_group.clone())),
            capture: Arc::new(CaptureController::new(
                config.capture.clone(),
                config.settings.autofocus_drive.clone(),
            )),
            liveview,
            catalog,
            names: config.settings.clone(),
            context,
        }
    }

    pub fn context(&self) -> &CameraContext {
        &self.context
    }

    pub fn liveview_server(&self) -> &LiveViewServer {
        &self.liveview
    }

    pub async fn execute(&self, command: Command) -> Response {
        debug!("Executing command: {}", command);
        match command {
            Command::ListSettings => self.list_settings().await,
            Command::SetFocusPoint(value) => self.set_focus_point(&value).await,
            Command::SetAperture(value) => self.set_aperture(&value).await,
            Command::SetSpeed(value) => self.set_speed(&value).await,
            Command::SetIso(value) => self.set_iso(&value).await,
            Command::SetWhitebalance(value) => self.set_whitebalance(&value).await,
            Command::Shot => self.shot().await,
            Command::LiveView(action) => self.liveview(action).await,
            Command::Burst(count) => self.burst(count).await,
            Command::Autofocus => self.autofocus().await,
            Command::Reinitialize => self.reinitialize().await,
            Command::Status => self.status().await,
        }
    }

    pub async fn list_settings(&self) -> Response {
        self.respond("list_settings", self.read_settings().await)
    }

    pub async fn set_focus_point(&self, value: &str) -> Response {
        let name = self.names.focus_point.clone();
        self.respond("set_focus_point", self.write_setting(name, value).await)
    }

    pub async fn set_aperture(&self, value: &str) -> Response {
        let name = self.names.aperture.clone();
        self.respond("set_aperture", self.write_setting(name, value).await)
    }

    pub async fn set_speed(&self, value: &str) -> Response {
        let name = self.names.speed.clone();
        self.respond("set_speed", self.write_setting(name, value).await)
    }

    pub async fn set_iso(&self, value: &str) -> Response {
        let name = self.names.iso.clone();
        self.respond("set_iso", self.write_setting(name, value).await)
    }

    pub async fn set_whitebalance(&self, value: &str) -> Response {
        let name = self.names.whitebalance.clone();
        self.respond("set_whitebalance", self.write_setting(name, value).await)
    }

    /// Capture one still and return it base64 encoded
    pub async fn shot(&self) -> Response {
        self.respond("shot", self.capture_one().await)
    }

    pub async fn liveview(&self, action: LiveViewAction) -> Response {
        self.respond("liveview", self.control_liveview(action))
    }

    /// All-or-nothing: one failed exposure discards the whole burst
    pub async fn burst(&self, count: usize) -> Response {
        self.respond("burst", self.capture_burst(count).await)
    }

    pub async fn autofocus(&self) -> Response {
        self.respond("autofocus", self.step_focus().await)
    }

    /// Re-detect the camera; runs even when none was found
    pub async fn reinitialize(&self) -> Response {
        let result = match self.context.reinitialize().await {
            Ok(true) => Ok(json!({ "camera_found": true })),
            Ok(false) => Err(CamctlError::CameraNotFound),
            Err(e) => Err(e.into()),
        };
        self.respond("reinitialize", result)
    }

    pub async fn status(&self) -> Response {
        self.respond("status", self.describe())
    }

    /// Stop live view and wait for its worker to release the camera
    pub async fn shutdown(&self) {
        info!("Shutting down API");
        self.liveview.shutdown().await;
    }

    async fn read_settings(&self) -> Result<Value> {
        self.ensure_camera()?;
        let sync = Arc::clone(&self.sync);
        let tree = self.context.driver().run(move |d| sync.read(d)).await??;
        Ok(serde_json::to_value(tree)?)
    }

    async fn write_setting(&self, name: String, value: &str) -> Result<Value> {
        self.ensure_camera()?;
        let sync = Arc::clone(&self.sync);
        let value = value.to_string();
        self.context
            .driver()
            .run(move |d| sync.write(d, &name, &value))
            .await??;
        Ok(Value::Null)
    }

    async fn capture_one(&self) -> Result<Value> {
        self.ensure_camera()?;
        let capture = Arc::clone(&self.capture);
        let session = self
            .context
            .driver()
            .run(move |d| capture.capture(d))
            .await??;
        debug!("Returning {} ({} bytes)", session.filename, session.size());
        Ok(json!({
            "filename": session.filename,
            "size": session.size(),
            "image": session.encoded(),
        }))
    }

    async fn capture_burst(&self, count: usize) -> Result<Value> {
        self.ensure_camera()?;
        let capture = Arc::clone(&self.capture);
        let sessions = self
            .context
            .driver()
            .run(move |d| capture.burst(d, count))
            .await??;
        let frames: Vec<String> = sessions.iter().map(|s| s.encoded()).collect();
        info!("Burst finished with {} frames", frames.len());
        Ok(json!({ "frames": frames }))
    }

    async fn step_focus(&self) -> Result<Value> {
        self.ensure_camera()?;
        let capture = Arc::clone(&self.capture);
        let sync = Arc::clone(&self.sync);
        let value = self
            .context
            .driver()
            .run(move |d| capture.autofocus(d, &sync))
            .await??;
        debug!("Autofocus drive set to {:?}", value);
        Ok(Value::Null)
    }

    fn control_liveview(&self, action: LiveViewAction) -> Result<Value> {
        self.ensure_camera()?;
        match action {
            LiveViewAction::Start => self.liveview.start()?,
            LiveViewAction::Stop => {
                if !self.liveview.stop() {
                    debug!("Live view already stopped");
                }
            }
        }
        Ok(Value::Null)
    }

    fn describe(&self) -> Result<Value> {
        Ok(json!({
            "camera_found": self.context.camera_found(),
            "liveview": serde_json::to_value(self.liveview.status())?,
        }))
    }

    fn ensure_camera(&self) -> Result<()> {
        if self.context.camera_found() {
            Ok(())
        } else {
            Err(CamctlError::CameraNotFound)
        }
    }

    fn respond(&self, command: &str, result: Result<Value>) -> Response {
        match result {
            Ok(data) => {
                debug!("Command '{}' succeeded", command);
                Response::with_data(data)
            }
            Err(e) => {
                let code = e.response_code();
                match code {
                    ResponseCode::CameraNotFound => warn!("Command '{}': {}", command, e),
                    _ => error!("Command '{}' failed: {}", command, e),
                }
                Response::fail(self.catalog.message_for(code))
            }
        }
    }
}
