//! Document persistence for the redirect state
//!
//! Two JSON documents live in the data directory:
//!
//! - `config.json` - the [`RedirectConfig`] record
//! - `presets.json` - the ordered preset mapping (see [`presets`])
//!
//! Loading never fails: a missing or unreadable document yields defaults and
//! a warning. Saving overwrites the whole document through a temp file and a
//! rename, creating the directory when needed.

pub mod presets;

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{Preset, RedirectConfig};

pub use presets::DecodedPresets;

/// File name of the configuration document
pub const CONFIG_FILE: &str = "config.json";

/// File name of the preset document
pub const PRESETS_FILE: &str = "presets.json";

/// Reads and writes the configuration and preset documents
#[derive(Debug, Clone)]
pub struct DocumentStore {
    config_path: PathBuf,
    presets_path: PathBuf,
}

impl DocumentStore {
    /// Store both documents inside `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            config_path: data_dir.join(CONFIG_FILE),
            presets_path: data_dir.join(PRESETS_FILE),
        }
    }

    /// Store the documents at explicit paths
    pub fn with_paths(config_path: impl Into<PathBuf>, presets_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            presets_path: presets_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn presets_path(&self) -> &Path {
        &self.presets_path
    }

    /// Load the configuration document, falling back to defaults
    pub fn load_config(&self) -> RedirectConfig {
        match read_json(&self.config_path) {
            Some(value) => match serde_json::from_value(value) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %self.config_path.display(),
                        error = %e,
                        "Config document is malformed, using defaults"
                    );
                    RedirectConfig::default()
                }
            },
            None => RedirectConfig::default(),
        }
    }

    /// Overwrite the configuration document
    pub fn save_config(&self, config: &RedirectConfig) -> Result<()> {
        write_json_atomic(&self.config_path, config)?;
        tracing::debug!(path = %self.config_path.display(), "Config saved");
        Ok(())
    }

    /// Load and migrate the preset document, falling back to an empty set
    pub fn load_presets(&self) -> DecodedPresets {
        match read_json(&self.presets_path) {
            Some(value) => presets::decode(value),
            None => DecodedPresets::default(),
        }
    }

    /// Overwrite the preset document
    pub fn save_presets(&self, presets: &[Preset]) -> Result<()> {
        write_json_atomic(&self.presets_path, &presets::encode(presets))?;
        tracing::debug!(
            path = %self.presets_path.display(),
            count = presets.len(),
            "Presets saved"
        );
        Ok(())
    }
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Document not found, using defaults");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Document is not valid JSON");
            None
        }
    }
}

/// Write to a sibling temp file first, then rename over the target
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::persistence(parent, e))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.json".to_string());
    let temp_path = path.with_file_name(format!("{file_name}.tmp"));

    let file = File::create(&temp_path).map_err(|e| Error::persistence(&temp_path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer
        .flush()
        .map_err(|e| Error::persistence(&temp_path, e))?;
    drop(writer);

    fs::rename(&temp_path, path).map_err(|e| Error::persistence(path, e))?;
    Ok(())
}
