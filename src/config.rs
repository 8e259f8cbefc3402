//! Import configuration.
//!
//! Handles loading, validating, and merging `import.toml`. Stock defaults are
//! overridden by the user file, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! destination = "FoundryImport"  # Folder inside the vault that receives the import
//! data_root = "."                # Foundry data directory asset paths are relative to
//! asset_folder = "assets"        # Subfolder of `destination` for copied assets
//! folder_notes = false           # Write a note into every folder
//! folder_type = "JournalEntry"   # Folder records of other types are ignored
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! destination = "Campaign/Journal"
//! folder_notes = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILENAME: &str = "import.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Import configuration loaded from `import.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Vault-relative folder that receives every imported file.
    pub destination: PathBuf,
    /// Foundry data directory; `![](worlds/...)` paths resolve against it.
    pub data_root: PathBuf,
    /// Name of the asset subfolder under `destination`.
    pub asset_folder: String,
    /// Write one note per folder, named after the folder.
    pub folder_notes: bool,
    /// Folder category to import.
    pub folder_type: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("FoundryImport"),
            data_root: PathBuf::from("."),
            asset_folder: "assets".to_string(),
            folder_notes: false,
            folder_type: "JournalEntry".to_string(),
        }
    }
}

impl ImportConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.as_os_str().is_empty() {
            return Err(ConfigError::Validation("destination must not be empty".into()));
        }
        if self
            .destination
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ConfigError::Validation(
                "destination must be a relative path inside the vault".into(),
            ));
        }
        if self.asset_folder.is_empty()
            || self.asset_folder.contains(['/', '\\'])
            || self.asset_folder == ".."
        {
            return Err(ConfigError::Validation(
                "asset_folder must be a single folder name".into(),
            ));
        }
        if self.folder_type.trim().is_empty() {
            return Err(ConfigError::Validation("folder_type must not be empty".into()));
        }
        Ok(())
    }

    /// Vault-relative asset folder.
    pub fn asset_dir(&self) -> PathBuf {
        self.destination.join(&self.asset_folder)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ImportConfig::default())?)
}

/// Overlay the keys of `overlay` on top of `base`.
///
/// The config is one flat table: keys in the overlay replace the stock
/// values, every other stock key is kept.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                base_table.insert(key, value);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ImportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ImportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or from `import.toml` in the working directory.
///
/// An explicitly given path must exist; the implicit one is optional.
pub fn load_config(path: Option<&Path>) -> Result<ImportConfig, ConfigError> {
    let overlay = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::Validation(format!(
                "config file not found: {}",
                p.display()
            )));
        }
        Some(p) => load_raw_config(p)?,
        None => load_raw_config(Path::new(CONFIG_FILENAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `import.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Foundry Import Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--destination, --data-root, --folder-notes) override
# the values in this file. Unknown keys will cause an error.

# Folder inside the vault that receives the import. Re-running an import
# into the same destination replaces files with the same name.
destination = "FoundryImport"

# Foundry data directory (the one containing worlds/, modules/, ...).
# Image and media paths in journal content are relative to it.
data_root = "."

# Subfolder of `destination` that receives copied images and media.
# Assets are stored by file name only; equal names overwrite each other.
asset_folder = "assets"

# Write a note into every folder, named after the folder.
folder_notes = false

# Only folders of this type are imported.
folder_type = "JournalEntry"
"##
}
