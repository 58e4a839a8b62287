use crate::error::{CamctlError, ResponseCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One `[[message]]` table of a catalog file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub code: u32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "message")]
    messages: Vec<CatalogEntry>,
}

/// Response code to display text lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let entry = |code: ResponseCode, text: &str| CatalogEntry {
            code: code.code(),
            text: text.to_string(),
        };

        Self {
            entries: vec![
                entry(ResponseCode::Success, "Success"),
                entry(ResponseCode::CameraNotFound, "No camera found"),
                entry(ResponseCode::OperationFailed, "The camera operation failed"),
            ],
        }
    }
}

impl MessageCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load a TOML catalog; the file replaces the built-in messages entirely
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CamctlError> {
        let path = path.as_ref();
        debug!("Loading message catalog from: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&text)?;
        info!(
            "Loaded {} messages from {}",
            catalog.entries.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CamctlError> {
        let file: CatalogFile = toml::from_str(text)?;
        Ok(Self::new(file.messages))
    }

    /// First entry with a matching code wins
    pub fn message(&self, code: u32) -> String {
        self.entries
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.text.clone())
            .unwrap_or_else(|| format!("Unknown response code {}", code))
    }

    pub fn message_for(&self, code: ResponseCode) -> String {
        self.message(code.code())
    }
}
