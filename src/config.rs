//! Tool configuration module.
//!
//! Handles loading, validating, and merging `passport-sheet.toml`. Stock
//! defaults are serialized to a TOML table and the user file is merged on top,
//! so a config file only needs the keys it wants to change. Command-line flags
//! override the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sheet]
//! size = "2x2"              # "2x2" | "3.5x4.5" | "5x5"
//! copies = 8                # 1-40
//!
//! [adjust]
//! background = "#ffffff"    # Fill behind a background-removed subject
//! brightness = 0            # -100..100
//!
//! [removal]
//! endpoint = "http://127.0.0.1:5000/remove-bg"
//! user_agent = "passport-sheet/<version>"
//! cache_dir = ".passport-sheet-cache"
//!
//! [export]
//! format = "pdf"            # "pdf" | "jpg" | "png"
//! output_dir = "."
//! ```
//!
//! Page size, margin, gap and DPI are fixed and cannot be configured.
//! Unknown keys are rejected to catch typos early.

use crate::compose::AdjustmentSettings;
use crate::export::ExportFormat;
use crate::geometry::PhotoSize;
use crate::imaging::{Brightness, CopyCount, parse_hex_color};
use crate::removal::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILENAME: &str = "passport-sheet.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `passport-sheet.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Photo size and number of copies on the sheet.
    pub sheet: SheetConfig,
    /// Working-image adjustments.
    pub adjust: AdjustConfig,
    /// Background-removal service.
    pub removal: RemovalConfig,
    /// Export format and destination.
    pub export: ExportConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(CopyCount::MIN..=CopyCount::MAX).contains(&self.sheet.copies) {
            return Err(ConfigError::Validation(format!(
                "sheet.copies must be {}-{}",
                CopyCount::MIN,
                CopyCount::MAX
            )));
        }
        if !(Brightness::MIN..=Brightness::MAX).contains(&self.adjust.brightness) {
            return Err(ConfigError::Validation(format!(
                "adjust.brightness must be {}..{}",
                Brightness::MIN,
                Brightness::MAX
            )));
        }
        parse_hex_color(&self.adjust.background)
            .map_err(|e| ConfigError::Validation(format!("adjust.background: {e}")))?;
        if !(self.removal.endpoint.starts_with("http://")
            || self.removal.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "removal.endpoint must be an http:// or https:// URL".into(),
            ));
        }
        if self.removal.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "removal.user_agent must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Initial adjustment settings. Removal always starts off.
    pub fn adjustment_settings(&self) -> Result<AdjustmentSettings, ConfigError> {
        let background = parse_hex_color(&self.adjust.background)
            .map_err(|e| ConfigError::Validation(format!("adjust.background: {e}")))?;
        Ok(AdjustmentSettings {
            use_removed_background: false,
            background,
            brightness: Brightness::new(self.adjust.brightness),
        })
    }
}

/// Sheet layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    pub size: PhotoSize,
    pub copies: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            size: PhotoSize::default(),
            copies: CopyCount::default().value(),
        }
    }
}

/// Adjustment defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustConfig {
    /// `#rrggbb` fill shown where the subject is transparent.
    pub background: String,
    pub brightness: i32,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            brightness: 0,
        }
    }
}

/// Background-removal service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Directory for removal results keyed by upload content hash.
    pub cache_dir: PathBuf,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_dir: PathBuf::from(".passport-sheet-cache"),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
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
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// With an explicit `path` the file must exist. Without one,
/// [`CONFIG_FILENAME`] in the working directory is used if present and stock
/// defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::Missing(path.to_path_buf()))?)
        }
        None => load_raw_config(Path::new(CONFIG_FILENAME))?,
    };
    if overlay.is_none() {
        tracing::debug!("No config file, using stock defaults");
    }
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `passport-sheet.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> String {
    format!(
        r##"# passport-sheet configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Sheet layout
# ---------------------------------------------------------------------------
[sheet]
# Photo size: "2x2" (inches), "3.5x4.5" or "5x5" (centimetres).
size = "2x2"

# Copies placed on the A4 page (1-40). Copies that do not fit are clipped.
copies = 8

# ---------------------------------------------------------------------------
# Adjustments
# ---------------------------------------------------------------------------
[adjust]
# Fill color behind the subject once the background has been removed.
background = "#ffffff"

# Brightness offset, -100 (black) to 100 (white).
brightness = 0

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[removal]
# Service that takes a multipart `file` field and returns the cut-out subject.
endpoint = "{DEFAULT_ENDPOINT}"

user_agent = "{DEFAULT_USER_AGENT}"

# Removal results are cached here, keyed by the uploaded file's content.
cache_dir = ".passport-sheet-cache"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Output format: "pdf", "jpg" or "png". Files are named passport_photos.<ext>.
format = "pdf"

output_dir = "."
"##
    )
}
