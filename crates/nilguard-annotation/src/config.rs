//! Configuration loading from nilguard.toml.

use serde::Deserialize;

/// Options for the nilability core.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NilabilityConfig {
    /// Report reads of nilable maps (`MapAccess` consumers). Off by
    /// default: a nil map read yields the zero value rather than
    /// panicking, so many codebases tolerate it.
    pub report_nilable_map_reads: bool,
}

impl NilabilityConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML text did not parse or did not match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_does_not_report_map_reads() {
        let config = NilabilityConfig::default();
        assert!(!config.report_nilable_map_reads);
    }

    #[test]
    fn test_from_toml_str() {
        let config = NilabilityConfig::from_toml_str("report_nilable_map_reads = true").unwrap();
        assert!(config.report_nilable_map_reads);

        let empty = NilabilityConfig::from_toml_str("").unwrap();
        assert!(!empty.report_nilable_map_reads);
    }

    #[test]
    fn test_from_toml_str_rejects_bad_input() {
        let err = NilabilityConfig::from_toml_str("report_nilable_map_reads = \"yes\"");
        assert!(err.is_err());
    }
}
