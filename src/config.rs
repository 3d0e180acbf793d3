//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so a missing file or an empty one runs the
//! stock Steam Deck layout.

use evdev::BusType;
use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::locator::{
    ControllerMatcher, DeviceIdentity, DEFAULT_DEVICE_DIR, STEAM_DECK_PRODUCT_ID,
    STEAM_DECK_VENDOR_ID,
};
use crate::controller::mapping::{MappingRule, MappingTable, ModifierMask};
use crate::error::{DeckbdError, Result};
use crate::keys::parse_key;
use crate::output::sink::DEFAULT_DEVICE_NAME;

/// Configuration file read when no path is given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "/etc/deckbd/config.toml";

/// uinput rejects device names of this many bytes or more
const UINPUT_MAX_NAME_SIZE: usize = 80;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub virtual_device: VirtualDeviceConfig,
    pub logging: LoggingConfig,
    pub mappings: Vec<MappingConfig>,
}

/// Controller discovery configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_device_dir")]
    pub device_dir: String,

    #[serde(default = "default_bus_type")]
    pub bus_type: u16,

    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    #[serde(default = "default_signature_button")]
    pub signature_button: String,
}

/// Virtual keyboard configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VirtualDeviceConfig {
    #[serde(default = "default_device_name")]
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One button-to-key rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MappingConfig {
    pub button: String,
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

// Default value functions
fn default_device_dir() -> String { DEFAULT_DEVICE_DIR.to_string() }
fn default_bus_type() -> u16 { BusType::BUS_USB.0 }
fn default_vendor_id() -> u16 { STEAM_DECK_VENDOR_ID }
fn default_product_id() -> u16 { STEAM_DECK_PRODUCT_ID }
fn default_signature_button() -> String { "BTN_DPAD_UP".to_string() }

fn default_device_name() -> String { DEFAULT_DEVICE_NAME.to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            bus_type: default_bus_type(),
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            signature_button: default_signature_button(),
        }
    }
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deckbd::config::Config;
    ///
    /// let config = Config::load("/etc/deckbd/config.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else [`DEFAULT_CONFIG_PATH`] if it exists,
    /// else built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Identity and signature button the controller must match
    pub fn matcher(&self) -> Result<ControllerMatcher> {
        let identity = DeviceIdentity::new(
            BusType(self.controller.bus_type),
            self.controller.vendor_id,
            self.controller.product_id,
        );
        let signature = parse_key(&self.controller.signature_button)?;
        Ok(ControllerMatcher::new(identity, signature))
    }

    /// The configured mapping table, or the Steam Deck default when no
    /// `[[mappings]]` are given
    pub fn mapping_table(&self) -> Result<MappingTable> {
        if self.mappings.is_empty() {
            return Ok(MappingTable::steam_deck());
        }

        let rules = self
            .mappings
            .iter()
            .map(|mapping| -> Result<MappingRule> {
                Ok(MappingRule::new(
                    parse_key(&mapping.button)?,
                    ModifierMask::from_names(&mapping.modifiers)?,
                    parse_key(&mapping.key)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        MappingTable::new(rules)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range or
    /// names an unknown key
    fn validate(&self) -> Result<()> {
        if self.controller.device_dir.is_empty() {
            return Err(DeckbdError::Config(
                toml::de::Error::custom("device_dir cannot be empty")
            ));
        }

        if self.controller.vendor_id == 0 || self.controller.product_id == 0 {
            return Err(DeckbdError::Config(
                toml::de::Error::custom("vendor_id and product_id must be non-zero")
            ));
        }

        if self.virtual_device.name.is_empty() {
            return Err(DeckbdError::Config(
                toml::de::Error::custom("virtual device name cannot be empty")
            ));
        }

        if self.virtual_device.name.len() >= UINPUT_MAX_NAME_SIZE {
            return Err(DeckbdError::Config(
                toml::de::Error::custom(format!(
                    "virtual device name must be shorter than {} bytes",
                    UINPUT_MAX_NAME_SIZE
                ))
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(DeckbdError::Config(
                toml::de::Error::custom("log level must be one of: trace, debug, info, warn, error")
            ));
        }

        // Unknown names and duplicate buttons surface here
        self.matcher()?;
        self.mapping_table()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::Key;

    fn mapping(button: &str, key: &str, modifiers: &[&str]) -> MappingConfig {
        MappingConfig {
            button: button.to_string(),
            key: key.to_string(),
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mapping_table().unwrap(), MappingTable::steam_deck());
        assert_eq!(config.matcher().unwrap(), ControllerMatcher::steam_deck());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.controller.device_dir, "/dev/input");
        assert_eq!(config.virtual_device.name, "deckbd");
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[controller]
vendor_id = 0x28de
product_id = 0x1205
signature_button = "BTN_DPAD_UP"

[virtual_device]
name = "deckbd-test"

[logging]
level = "debug"

[[mappings]]
button = "BTN_A"
key = "KEY_SPACE"

[[mappings]]
button = "BTN_SELECT"
key = "KEY_TAB"
modifiers = ["LEFTALT"]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.virtual_device.name, "deckbd-test");
        assert_eq!(config.logging.level, "debug");

        let table = config.mapping_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rules()[0].button, Key::BTN_SOUTH);
        assert_eq!(table.rules()[0].key, Key::KEY_SPACE);
        assert_eq!(table.rules()[1].modifiers, ModifierMask::LEFT_ALT);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = Config::parse(include_str!("../config/deckbd.toml")).unwrap();
        assert_eq!(config.mappings.len(), 12);
        assert_eq!(config.mapping_table().unwrap(), MappingTable::steam_deck());
        assert_eq!(config.matcher().unwrap(), ControllerMatcher::steam_deck());
    }

    #[test]
    fn test_discover_explicit_missing_file() {
        let result = Config::discover(Some(Path::new("/nonexistent/deckbd.toml")));
        assert!(matches!(result, Err(DeckbdError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::parse("[controller\nvendor_id = 1"),
            Err(DeckbdError::Config(_))
        ));
    }

    #[test]
    fn test_empty_device_dir() {
        let mut config = Config::default();
        config.controller.device_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_vendor_id() {
        let mut config = Config::default();
        config.controller.vendor_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_product_id() {
        let mut config = Config::default();
        config.controller.product_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_signature_button() {
        let mut config = Config::default();
        config.controller.signature_button = "BTN_NOPE".to_string();
        assert!(matches!(config.validate(), Err(DeckbdError::UnknownKey(_))));
    }

    #[test]
    fn test_empty_device_name() {
        let mut config = Config::default();
        config.virtual_device.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_name_too_long() {
        let mut config = Config::default();
        config.virtual_device.name = "d".repeat(80);
        assert!(config.validate().is_err());

        config.virtual_device.name = "d".repeat(79);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_unknown_mapping_key() {
        let mut config = Config::default();
        config.mappings = vec![mapping("BTN_TL", "KEY_NOPE", &[])];
        assert!(matches!(config.validate(), Err(DeckbdError::UnknownKey(_))));
    }

    #[test]
    fn test_unknown_modifier() {
        let mut config = Config::default();
        config.mappings = vec![mapping("BTN_TL", "KEY_A", &["HYPER"])];
        assert!(matches!(config.validate(), Err(DeckbdError::UnknownKey(_))));
    }

    #[test]
    fn test_duplicate_mapping_button() {
        let mut config = Config::default();
        config.mappings = vec![
            mapping("BTN_A", "KEY_A", &[]),
            mapping("BTN_SOUTH", "KEY_B", &[]),
        ];
        assert!(matches!(
            config.validate(),
            Err(DeckbdError::DuplicateButton(_))
        ));
    }

    #[test]
    fn test_custom_identity() {
        let mut config = Config::default();
        config.controller.bus_type = BusType::BUS_BLUETOOTH.0;
        config.controller.vendor_id = 0x054c;
        config.controller.product_id = 0x0ce6;
        config.controller.signature_button = "BTN_SOUTH".to_string();

        let matcher = config.matcher().unwrap();
        assert_eq!(matcher.identity.bus, BusType::BUS_BLUETOOTH);
        assert_eq!(matcher.identity.vendor, 0x054c);
        assert_eq!(matcher.signature, Key::BTN_SOUTH);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_device_dir(), "/dev/input");
        assert_eq!(default_bus_type(), 0x03);
        assert_eq!(default_vendor_id(), 0x28de);
        assert_eq!(default_product_id(), 0x1205);
        assert_eq!(default_signature_button(), "BTN_DPAD_UP");
        assert_eq!(default_device_name(), "deckbd");
        assert_eq!(default_log_level(), "info");
    }
}
