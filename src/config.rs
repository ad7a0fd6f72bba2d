//! Configuration module.
//!
//! Handles loading, validating, and merging `lorcy.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names, and CLI flags
//! override both.
//!
//! ## Config File Location
//!
//! `lorcy.toml` in the working directory is picked up automatically. Any
//! other file can be passed with `--config <path>`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! dataset = "data/full.json"   # Source card dataset
//! # cache_dir = "..."          # Default: see "Cache directory" below
//! # output_dir = "..."         # Default: ~/Downloads, else home
//!
//! [dataset]
//! cache_policy = "trust"       # "trust" | "mtime" | "content-hash"
//!
//! [fetch]
//! timeout_secs = 20            # Per-request timeout for card images
//! user_agent = "lorcy/<version>"
//!
//! [fonts]
//! bold = "assets/fonts/comicbd.ttf"
//! regular = "assets/fonts/comic.ttf"
//!
//! [output]
//! jpeg_quality = 90            # Cached images and PDF pages (1-100)
//! ```
//!
//! ## Cache directory
//!
//! When `paths.cache_dir` is unset, the cache resolves to
//! `<crate dir>/cache_lorcana` in debug builds (running from a checkout), and
//! to the platform cache directory otherwise (`~/.cache/lorcy/cache_lorcana`
//! on Linux), falling back to the system temp directory.
//!
//! Unknown keys are rejected to catch typos early.

use crate::cache::CachePolicy;
use crate::imaging::FontPaths;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name picked up from the working directory.
pub const CONFIG_FILENAME: &str = "lorcy.toml";

/// Cache subdirectory name, shared by every execution context.
const CACHE_DIR_NAME: &str = "cache_lorcana";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `lorcy.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LorcyConfig {
    /// Dataset, cache, and output locations.
    pub paths: PathsConfig,
    /// Dataset cache reuse.
    pub dataset: DatasetConfig,
    /// Card image downloads.
    pub fetch: FetchConfig,
    /// Faces for text-mode cards.
    pub fonts: FontsConfig,
    /// Encoding of cached images and document pages.
    pub output: OutputConfig,
}

impl LorcyConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.dataset.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "paths.dataset must not be empty".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "fetch.user_agent must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Source dataset JSON.
    pub dataset: PathBuf,
    /// Cache directory. When absent, resolved per execution context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Where documents are written. When absent, the user's Downloads folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/full.json"),
            cache_dir: None,
            output_dir: None,
        }
    }
}

impl PathsConfig {
    /// Effective cache directory. See the [module docs](self).
    pub fn resolve_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        if cfg!(debug_assertions) {
            return Path::new(env!("CARGO_MANIFEST_DIR")).join(CACHE_DIR_NAME);
        }
        ProjectDirs::from("", "", "lorcy")
            .map(|dirs| dirs.cache_dir().join(CACHE_DIR_NAME))
            .unwrap_or_else(|| std::env::temp_dir().join("lorcy").join(CACHE_DIR_NAME))
    }

    /// Effective output directory: configured, else Downloads, else home,
    /// else the working directory.
    pub fn resolve_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        UserDirs::new()
            .map(|dirs| {
                dirs.download_dir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dirs.home_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Dataset cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// When the flattened-dataset cache may be reused.
    pub cache_policy: CachePolicy,
}

/// Image download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: concat!("lorcy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-card font files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub bold: PathBuf,
    pub regular: PathBuf,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            bold: PathBuf::from("assets/fonts/comicbd.ttf"),
            regular: PathBuf::from("assets/fonts/comic.ttf"),
        }
    }
}

impl FontsConfig {
    pub fn to_font_paths(&self) -> FontPaths {
        FontPaths {
            bold: self.bold.clone(),
            regular: self.regular.clone(),
        }
    }
}

/// Encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG quality for cached card images and PDF pages (1-100).
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
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
    toml::Value::try_from(LorcyConfig::default()).expect("default config must serialize")
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
/// Returns `Err` if the file exists but contains invalid TOML.
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
) -> Result<LorcyConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: LorcyConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `lorcy.toml` from the given directory, or stock defaults when absent.
pub fn load_config(dir: &Path) -> Result<LorcyConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILENAME))?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<LorcyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Returns a fully-commented stock `lorcy.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Lorcy Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as lorcy.toml in the working directory, or pass
# --config <path>. Command-line flags override values set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Locations
# ---------------------------------------------------------------------------
[paths]
# Card dataset: a JSON document with a top-level "cards" key.
dataset = "data/full.json"

# Cache for the flattened dataset and downloaded card images.
# Default: <crate dir>/cache_lorcana when running a debug build,
# otherwise the platform cache directory (e.g. ~/.cache/lorcy/cache_lorcana).
# cache_dir = "cache_lorcana"

# Where generated PDFs are written. Default: your Downloads folder.
# output_dir = "proxies"

# ---------------------------------------------------------------------------
# Dataset cache
# ---------------------------------------------------------------------------
[dataset]
# When to reuse the flattened dataset cache:
#   "trust"        - always, once it exists (fastest; edits to the dataset
#                    are ignored until `lorcy flatten` is run)
#   "mtime"        - only while the dataset's modification time is unchanged
#   "content-hash" - only while the dataset's SHA-256 is unchanged
cache_policy = "trust"

# ---------------------------------------------------------------------------
# Image downloads
# ---------------------------------------------------------------------------
[fetch]
# Timeout for each image request, in seconds. Failed downloads abort the run.
timeout_secs = 20

# User-Agent header sent to the image host.
# user_agent = "lorcy/<version>"

# ---------------------------------------------------------------------------
# Text-mode fonts
# ---------------------------------------------------------------------------
[fonts]
# TrueType faces used to draw text cards. Only needed for --mode text, or for
# cards without an image.
bold = "assets/fonts/comicbd.ttf"
regular = "assets/fonts/comic.ttf"

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[output]
# JPEG quality for cached card images and PDF pages (1 = worst, 100 = best).
jpeg_quality = 90
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = LorcyConfig::default();
        assert_eq!(config.paths.dataset, PathBuf::from("data/full.json"));
        assert_eq!(config.paths.cache_dir, None);
        assert_eq!(config.dataset.cache_policy, CachePolicy::Trust);
        assert_eq!(config.fetch.timeout_secs, 20);
        assert!(config.fetch.user_agent.starts_with("lorcy/"));
        assert_eq!(config.fonts.bold, PathBuf::from("assets/fonts/comicbd.ttf"));
        assert_eq!(config.output.jpeg_quality, 90);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[dataset]
cache_policy = "content-hash"
"#;
        let config: LorcyConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.dataset.cache_policy, CachePolicy::ContentHash);
        // Default values preserved
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.paths.dataset, PathBuf::from("data/full.json"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
[fetch]
timeout = 5
"#;
        assert!(toml::from_str::<LorcyConfig>(toml).is_err());
    }

    #[test]
    fn unknown_cache_policy_is_rejected() {
        let toml = r#"
[dataset]
cache_policy = "sometimes"
"#;
        assert!(toml::from_str::<LorcyConfig>(toml).is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(LorcyConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = LorcyConfig::default();
        config.fetch.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_quality_range() {
        let mut config = LorcyConfig::default();
        config.output.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.output.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.output.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_empty_user_agent() {
        let mut config = LorcyConfig::default();
        config.fetch.user_agent = "  ".into();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    #[test]
    fn configured_dirs_win() {
        let paths = PathsConfig {
            cache_dir: Some(PathBuf::from("/tmp/c")),
            output_dir: Some(PathBuf::from("/tmp/o")),
            ..PathsConfig::default()
        };
        assert_eq!(paths.resolve_cache_dir(), PathBuf::from("/tmp/c"));
        assert_eq!(paths.resolve_output_dir(), PathBuf::from("/tmp/o"));
    }

    #[test]
    fn debug_cache_dir_is_next_to_the_crate() {
        // Tests always build with debug assertions.
        let dir = PathsConfig::default().resolve_cache_dir();
        assert_eq!(dir, Path::new(env!("CARGO_MANIFEST_DIR")).join("cache_lorcana"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, LorcyConfig::default());
    }

    #[test]
    fn load_config_merges_user_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[paths]
output_dir = "/srv/proxies"

[fetch]
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.paths.output_dir, Some(PathBuf::from("/srv/proxies")));
        assert_eq!(config.fetch.timeout_secs, 5);
        assert!(config.fetch.user_agent.starts_with("lorcy/"));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[output]
jpeg_quality = 0
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[paths\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_requires_the_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    // =========================================================================
    // merge_toml / resolve_config tests
    // =========================================================================

    #[test]
    fn merge_toml_overrides_nested_keys_only() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config, LorcyConfig::default());
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[fetch]\ntimeout_secs = 0\n").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: LorcyConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, LorcyConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[paths]", "[dataset]", "[fetch]", "[fonts]", "[output]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for key in ["paths", "dataset", "fetch", "fonts", "output"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }
}
