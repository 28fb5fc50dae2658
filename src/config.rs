use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Where rule in-effect statuses come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InEffectSource {
    /// Ask `crm_rule`.
    #[default]
    Pacemaker,
    /// Judge date expressions against the local clock.
    Clock,
    /// Leave every status unknown.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacemakerConfig {
    pub binaries_dir: PathBuf,
}

impl Default for PacemakerConfig {
    fn default() -> Self {
        Self {
            binaries_dir: PathBuf::from("/usr/sbin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InEffectConfig {
    pub source: InEffectSource,
}

/// Crate settings, usually loaded from TOML. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pacemaker: PacemakerConfig,
    pub in_effect: InEffectConfig,
}

impl Config {
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if `text` is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn crm_rule_exec(&self) -> PathBuf {
        self.pacemaker.binaries_dir.join("crm_rule")
    }

    #[must_use]
    pub fn in_effect_source(&self) -> InEffectSource {
        self.in_effect.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.crm_rule_exec(), PathBuf::from("/usr/sbin/crm_rule"));
        assert_eq!(config.in_effect_source(), InEffectSource::Pacemaker);
        assert_eq!(Config::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn partial_tables() {
        let config = Config::from_toml_str("[in_effect]\nsource = \"clock\"\n").unwrap();
        assert_eq!(config.in_effect_source(), InEffectSource::Clock);
        assert_eq!(config.pacemaker, PacemakerConfig::default());
    }

    #[test]
    fn rejects_unknown_source() {
        let err = Config::from_toml_str("[in_effect]\nsource = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [pacemaker]
            binaries_dir = "/opt/pacemaker/sbin"

            [in_effect]
            source = "disabled"
            "#
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(
            config.crm_rule_exec(),
            PathBuf::from("/opt/pacemaker/sbin/crm_rule")
        );
        assert_eq!(config.in_effect_source(), InEffectSource::Disabled);
    }

    #[test]
    fn missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/cibrule.toml")).unwrap_err();
        assert!(err.to_string().starts_with("cannot read config file"));
    }
}
