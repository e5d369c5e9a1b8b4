//! Runtime configuration for a [`Db`](crate::Db) handle.

use std::path::Path;

use chrono::{FixedOffset, Utc};
use serde::Deserialize;

use crate::error::FluentError;

/// Default config file name, looked up relative to the working directory.
pub const CONFIG_FILE: &str = "fluentql.toml";

/// Engine settings. Every field has a default, so an empty TOML document is
/// a valid configuration.
///
/// ```toml
/// default_chunk_size = 250
/// strict_relations = true
/// debug = true
/// slow_query_ms = 50
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// Page size used by `chunk`/`cursor`/`lazy` conveniences that take none
    pub default_chunk_size: u64,
    /// Maximum number of keys bound into one relation fetch
    pub relation_batch_size: usize,
    /// Fail the whole read when eager loading fails instead of logging
    pub strict_relations: bool,
    /// Enables query plan and slow query diagnostics
    pub debug: bool,
    pub slow_query_ms: u64,
    /// `strftime`-style format for timestamp columns
    pub timestamp_format: String,
    /// Offset from UTC applied to generated timestamps
    pub utc_offset_seconds: i32,
    pub validation_locale: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            default_chunk_size: 500,
            relation_batch_size: 1000,
            strict_relations: false,
            debug: false,
            slow_query_ms: 200,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_owned(),
            utc_offset_seconds: 0,
            validation_locale: "en".to_owned(),
        }
    }
}

impl DbConfig {
    /// Load from the default config file
    pub fn load() -> Result<Self, FluentError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, FluentError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FluentError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, FluentError> {
        let config: Self =
            toml::from_str(content).map_err(|e| FluentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FluentError> {
        if self.default_chunk_size == 0 {
            return Err(FluentError::Config("default_chunk_size must be positive".into()));
        }
        if self.relation_batch_size == 0 {
            return Err(FluentError::Config("relation_batch_size must be positive".into()));
        }
        if FixedOffset::east_opt(self.utc_offset_seconds).is_none() {
            return Err(FluentError::Config(format!(
                "utc_offset_seconds out of range: {}",
                self.utc_offset_seconds
            )));
        }
        Ok(())
    }

    /// Current time rendered with the configured offset and format.
    pub fn now(&self) -> String {
        let now = Utc::now();
        match FixedOffset::east_opt(self.utc_offset_seconds) {
            Some(offset) => now.with_timezone(&offset).format(&self.timestamp_format).to_string(),
            None => now.format(&self.timestamp_format).to_string(),
        }
    }
}
