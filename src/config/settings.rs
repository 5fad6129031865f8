//! Application settings loading from config.toml
//!
//! Settings decide how the split is computed (which figure is the item base)
//! and how amounts are displayed. Every key is optional; a missing file yields
//! the defaults.

use crate::core::allocation::ItemBase;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// How the allocator computes each participant's share
    pub split: SplitSettings,
    /// How amounts are rendered
    pub display: DisplaySettings,
}

/// `[split]` section
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SplitSettings {
    /// Which figure divides a participant's item spend when prorating fees
    pub item_base: ItemBase,
}

/// `[display]` section
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Prefix for formatted amounts
    pub currency_symbol: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is malformed or a value has the wrong type.
pub fn parse_config(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from ./config.toml, falling back to defaults when the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_default_config() -> Result<Settings> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::info!("No config.toml found, using default settings");
        return Ok(Settings::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [split]
            item_base = "item_lines"

            [display]
            currency_symbol = "€"
        "#;

        let settings = parse_config(toml_str).unwrap();
        assert_eq!(settings.split.item_base, ItemBase::ItemLines);
        assert_eq!(settings.display.currency_symbol, "€");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = parse_config("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.split.item_base, ItemBase::ReceiptTotal);
        assert_eq!(settings.display.currency_symbol, "$");
    }

    #[test]
    fn test_partial_config() {
        let settings = parse_config("[display]\ncurrency_symbol = \"£\"\n").unwrap();
        assert_eq!(settings.split.item_base, ItemBase::ReceiptTotal);
        assert_eq!(settings.display.currency_symbol, "£");
    }

    #[test]
    fn test_invalid_item_base_is_config_error() {
        let result = parse_config("[split]\nitem_base = \"subtotal\"\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
