//! Settings file deserialization.

use serde::Deserialize;

/// Tunables read from the optional settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Repositories processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub import: ImportSettings,

    #[serde(default)]
    pub templates: TemplateSettings,
}

/// Import tracking schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ImportSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

/// Attribution templates for migrated bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TemplateSettings {
    #[serde(default = "default_issue_template")]
    pub issue: String,

    #[serde(default = "default_comment_template")]
    pub comment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            import: ImportSettings::default(),
            templates: TemplateSettings::default(),
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            issue: default_issue_template(),
            comment: default_comment_template(),
        }
    }
}

pub(crate) fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    20
}

fn default_issue_template() -> String {
    crate::templates::DEFAULT_ISSUE_TEMPLATE.to_string()
}

fn default_comment_template() -> String {
    crate::templates::DEFAULT_COMMENT_TEMPLATE.to_string()
}
