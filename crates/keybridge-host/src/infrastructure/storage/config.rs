//! TOML-based configuration for the keyboard bridge.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\keybridge\config.toml`
//! - Linux:    `~/.config/keybridge/config.toml`
//! - macOS:    `~/Library/Application Support/keybridge/config.toml`
//!
//! Every field has a serde default, so a missing file, an empty file and an
//! older file missing newer keys all load.  Example:
//!
//! ```toml
//! log_level = "debug"
//!
//! [serial]
//! preferred_port = "COM3"
//! baud = 9600
//!
//! [polling]
//! interval_ms = 4
//!
//! [exit]
//! modifiers = ["control", "shift"]
//! key = 0x47
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use keybridge_core::keymap::windows_vk::{FIRST_SAMPLED_VK, LAST_SAMPLED_VK, VK_G};
use keybridge_core::{ExitCombination, Modifier, VkRange};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::discover_port::{
    DiscoveryOptions, FailureClassifier, SerialSettings, DEFAULT_ACCESS_DENIED_MARKERS,
    DEFAULT_DETECT_MARKERS,
};
use crate::application::session::PollingPolicy;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub exit: ExitConfig,
}

/// Serial port selection and line settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port tried before any detected or enumerated port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_port: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Read/write timeout in milliseconds.  `0` means non-blocking.
    #[serde(default)]
    pub timeout_ms: u64,
    /// Pause after a successful open while the device resets.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Substrings of a port description that mark the target device.
    #[serde(default = "default_detect_markers")]
    pub detect_markers: Vec<String>,
    /// Case-sensitive substrings of an open error that mean "denied or busy".
    #[serde(default = "default_access_denied_markers")]
    pub access_denied_markers: Vec<String>,
}

/// Tick timing and swept VK range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_first_vk")]
    pub first_vk: u8,
    #[serde(default = "default_last_vk")]
    pub last_vk: u8,
}

/// The key chord that ends the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitConfig {
    /// Modifier names: `shift`, `control`, `alt`, `capslock`.
    #[serde(default = "default_exit_modifiers")]
    pub modifiers: Vec<String>,
    /// VK code of the non-modifier key.
    #[serde(default = "default_exit_key")]
    pub key: u8,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_baud() -> u32 {
    9600
}
fn default_settle_delay_ms() -> u64 {
    2000
}
fn default_detect_markers() -> Vec<String> {
    DEFAULT_DETECT_MARKERS.iter().map(|m| m.to_string()).collect()
}
fn default_access_denied_markers() -> Vec<String> {
    DEFAULT_ACCESS_DENIED_MARKERS.iter().map(|m| m.to_string()).collect()
}
fn default_interval_ms() -> u64 {
    4
}
fn default_first_vk() -> u8 {
    FIRST_SAMPLED_VK
}
fn default_last_vk() -> u8 {
    LAST_SAMPLED_VK
}
fn default_exit_modifiers() -> Vec<String> {
    vec!["control".to_string(), "shift".to_string()]
}
fn default_exit_key() -> u8 {
    VK_G
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            serial: SerialConfig::default(),
            polling: PollingConfig::default(),
            exit: ExitConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            preferred_port: None,
            baud: default_baud(),
            timeout_ms: 0,
            settle_delay_ms: default_settle_delay_ms(),
            detect_markers: default_detect_markers(),
            access_denied_markers: default_access_denied_markers(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            first_vk: default_first_vk(),
            last_vk: default_last_vk(),
        }
    }
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            modifiers: default_exit_modifiers(),
            key: default_exit_key(),
        }
    }
}

// ── Conversion into application options ──────────────────────────────────────

impl AppConfig {
    /// Discovery inputs for the serial section.
    pub fn to_discovery_options(&self) -> Result<DiscoveryOptions, ConfigError> {
        if self.serial.baud == 0 {
            return Err(ConfigError::Invalid("serial.baud must be greater than 0".to_string()));
        }
        let preferred_port = self
            .serial
            .preferred_port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(DiscoveryOptions {
            preferred_port,
            detect_markers: self.serial.detect_markers.clone(),
            classifier: FailureClassifier::new(self.serial.access_denied_markers.clone()),
            settings: SerialSettings {
                baud: self.serial.baud,
                timeout: Duration::from_millis(self.serial.timeout_ms),
                settle_delay: Duration::from_millis(self.serial.settle_delay_ms),
            },
        })
    }

    /// Polling loop policy for the polling and exit sections.
    pub fn to_polling_policy(&self) -> Result<PollingPolicy, ConfigError> {
        let range = VkRange::new(self.polling.first_vk, self.polling.last_vk)
            .map_err(|e| ConfigError::Invalid(format!("polling: {e}")))?;

        let modifiers = self
            .exit
            .modifiers
            .iter()
            .map(|name| name.parse::<Modifier>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Invalid(format!("exit.modifiers: {e}")))?;
        if !range.contains(self.exit.key) {
            return Err(ConfigError::Invalid(format!(
                "exit.key 0x{:02X} is outside the polled range",
                self.exit.key
            )));
        }

        Ok(PollingPolicy {
            interval: Duration::from_millis(self.polling.interval_ms),
            range,
            exit: ExitCombination::new(modifiers, self.exit.key),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory joined with `keybridge`.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("keybridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keybridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("keybridge"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("keybridge_test_{name}_{}", std::process::id()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_serial_settings() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.serial.baud, 9600);
        assert_eq!(cfg.serial.timeout_ms, 0);
        assert_eq!(cfg.serial.settle_delay_ms, 2000);
        assert_eq!(cfg.serial.detect_markers, ["Arduino", "CH340", "USB-SERIAL"]);
        assert!(cfg.serial.preferred_port.is_none());
    }

    #[test]
    fn test_app_config_default_polling_and_exit() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.polling.interval_ms, 4);
        assert_eq!((cfg.polling.first_vk, cfg.polling.last_vk), (0x01, 0xFE));
        assert_eq!(cfg.exit.key, 0x47);
        assert_eq!(cfg.log_level, "info");
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_serial_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[serial]
preferred_port = "COM3"
baud = 115200

[exit]
key = 0x51
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.serial.preferred_port.as_deref(), Some("COM3"));
        assert_eq!(cfg.serial.baud, 115200);
        assert_eq!(cfg.serial.settle_delay_ms, 2000);
        assert_eq!(cfg.exit.key, b'Q');
        assert_eq!(cfg.exit.modifiers, ["control", "shift"]);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let dir = temp_dir("bad_toml");
        let path = dir.join("config.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    // ── Conversion ────────────────────────────────────────────────────────────

    #[test]
    fn test_to_discovery_options_carries_serial_section() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.serial.preferred_port = Some(" COM7 ".to_string());
        cfg.serial.timeout_ms = 50;
        cfg.serial.access_denied_markers = vec!["busy".to_string()];

        // Act
        let options = cfg.to_discovery_options().unwrap();

        // Assert
        assert_eq!(options.preferred_port.as_deref(), Some("COM7"));
        assert_eq!(options.settings.timeout, Duration::from_millis(50));
        assert_eq!(options.settings.settle_delay, Duration::from_secs(2));
        assert_eq!(options.classifier.markers(), ["busy"]);
    }

    #[test]
    fn test_to_discovery_options_blank_preferred_port_is_none() {
        let mut cfg = AppConfig::default();
        cfg.serial.preferred_port = Some("   ".to_string());
        assert!(cfg.to_discovery_options().unwrap().preferred_port.is_none());
    }

    #[test]
    fn test_to_discovery_options_rejects_zero_baud() {
        let mut cfg = AppConfig::default();
        cfg.serial.baud = 0;
        assert!(matches!(cfg.to_discovery_options(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_to_polling_policy_defaults_match_session_defaults() {
        let policy = AppConfig::default().to_polling_policy().unwrap();
        assert_eq!(policy, PollingPolicy::default());
    }

    #[test]
    fn test_to_polling_policy_rejects_inverted_range() {
        let mut cfg = AppConfig::default();
        cfg.polling.first_vk = 0x60;
        cfg.polling.last_vk = 0x30;
        assert!(matches!(cfg.to_polling_policy(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_to_polling_policy_rejects_unknown_modifier() {
        let mut cfg = AppConfig::default();
        cfg.exit.modifiers = vec!["control".to_string(), "hyper".to_string()];
        let err = cfg.to_polling_policy().unwrap_err();
        assert!(err.to_string().contains("hyper"), "got: {err}");
    }

    #[test]
    fn test_to_polling_policy_rejects_exit_key_outside_range() {
        let mut cfg = AppConfig::default();
        cfg.polling.first_vk = 0x30;
        cfg.polling.last_vk = 0x39;
        assert!(matches!(cfg.to_polling_policy(), Err(ConfigError::Invalid(_))));
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = temp_dir("round_trip");
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.serial.preferred_port = Some("/dev/ttyUSB0".to_string());
        cfg.log_level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("keybridge/config.toml") || path.ends_with("config.toml"));
        }
    }
}
