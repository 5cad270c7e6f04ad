//! Settings file loading.
//!
//! Everything in the settings file is optional; a missing file means defaults.
//!
//! ```toml
//! concurrency = 4
//!
//! [import]
//! max-attempts = 5
//! base-delay-secs = 1
//! max-delay-secs = 20
//!
//! [templates]
//! issue = "{{body}}"
//! comment = "{{body}}"
//! ```

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{ImportSettings, Settings, TemplateSettings};

use crate::import::ImportPolicy;
use crate::templates::{TemplateError, TemplateRenderer};
use std::path::Path;
use std::time::Duration;
use tracing::info;

impl Settings {
    /// Reads and validates a settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::parse(&content).map_err(|e| match e {
            ParseError::Toml(source) => ConfigError::Toml {
                path: path.display().to_string(),
                source,
            },
            ParseError::Invalid(e) => e,
        })?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parses and validates settings from TOML text.
    fn parse(content: &str) -> Result<Self, ParseError> {
        let settings: Self = toml::from_str(content).map_err(ParseError::Toml)?;
        settings.validate().map_err(ParseError::Invalid)?;
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        if self.import.max_attempts == 0 {
            return Err(invalid("import.max-attempts", "must be at least 1"));
        }
        if self.import.max_delay_secs < self.import.base_delay_secs {
            return Err(invalid(
                "import.max-delay-secs",
                "must not be smaller than import.base-delay-secs",
            ));
        }
        if self.templates.issue.trim().is_empty() {
            return Err(invalid("templates.issue", "must not be blank"));
        }
        if self.templates.comment.trim().is_empty() {
            return Err(invalid("templates.comment", "must not be blank"));
        }
        Ok(())
    }

    /// Polling schedule for import tracking.
    #[must_use]
    pub fn import_policy(&self) -> ImportPolicy {
        ImportPolicy {
            max_attempts: self.import.max_attempts,
            base_delay: Duration::from_secs(self.import.base_delay_secs),
            max_delay: Duration::from_secs(self.import.max_delay_secs),
        }
    }

    /// Compiles the configured attribution templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn renderer(&self) -> Result<TemplateRenderer, TemplateError> {
        TemplateRenderer::new(&self.templates.issue, &self.templates.comment)
    }
}

enum ParseError {
    Toml(toml::de::Error),
    Invalid(ConfigError),
}

fn invalid(key: &'static str, message: &str) -> ConfigError {
    ConfigError::Validation {
        key,
        message: message.to_string(),
    }
}
