//! Runner configuration.

use crate::config::Settings;
use crate::github::GITHUB_COM;
use crate::gitlab::GITLAB_COM;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which part of the pipeline a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunScope {
    /// Repositories, imports, labels, issues, comments and wikis.
    #[default]
    Repos,
    /// Labels, issues and comments of repositories already at the destination.
    Issues,
    /// Wikis of repositories already at the destination.
    Wikis,
}

impl RunScope {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repos => "repos",
            Self::Issues => "issues",
            Self::Wikis => "wikis",
        }
    }

    /// Missing destination repositories are created in this scope.
    #[must_use]
    pub fn creates_repositories(&self) -> bool {
        matches!(self, Self::Repos)
    }

    #[must_use]
    pub fn migrates_issues(&self) -> bool {
        matches!(self, Self::Repos | Self::Issues)
    }

    #[must_use]
    pub fn migrates_wikis(&self) -> bool {
        matches!(self, Self::Repos | Self::Wikis)
    }
}

impl fmt::Display for RunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable configuration for one migration run.
#[derive(Clone)]
pub struct RunnerConfig {
    /// Destination access token.
    github_token: String,
    /// Source access token, also the import credential.
    gitlab_token: String,
    /// Source user the imports authenticate as.
    gitlab_user: String,
    /// Destination organization.
    org: String,
    /// Source base URL.
    gitlab_url: String,
    /// Destination base URL, used for wiki remotes.
    github_url: String,
    /// Whether the destination is the in-memory fake.
    dry_run: bool,
    scope: RunScope,
    /// Overrides [`Settings::concurrency`] when set.
    concurrency: Option<usize>,
    settings: Settings,
    /// SSH key used for wiki transfer.
    ssh_key_path: Option<PathBuf>,
}

impl RunnerConfig {
    /// Creates a configuration with default settings.
    pub fn new(
        github_token: impl Into<String>,
        gitlab_token: impl Into<String>,
        org: impl Into<String>,
        scope: RunScope,
    ) -> Self {
        Self {
            github_token: github_token.into(),
            gitlab_token: gitlab_token.into(),
            gitlab_user: String::new(),
            org: org.into(),
            gitlab_url: GITLAB_COM.to_string(),
            github_url: GITHUB_COM.to_string(),
            dry_run: false,
            scope,
            concurrency: None,
            settings: Settings::default(),
            ssh_key_path: None,
        }
    }

    /// Sets the source user.
    #[must_use]
    pub fn with_gitlab_user(mut self, user: impl Into<String>) -> Self {
        self.gitlab_user = user.into();
        self
    }

    /// Sets the source base URL.
    #[must_use]
    pub fn with_gitlab_url(mut self, url: impl Into<String>) -> Self {
        self.gitlab_url = url.into();
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Overrides the settings' concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_ssh_key_path(mut self, path: Option<PathBuf>) -> Self {
        self.ssh_key_path = path;
        self
    }

    pub fn github_token(&self) -> &str {
        &self.github_token
    }

    pub fn gitlab_token(&self) -> &str {
        &self.gitlab_token
    }

    pub fn gitlab_user(&self) -> &str {
        &self.gitlab_user
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn gitlab_url(&self) -> &str {
        &self.gitlab_url
    }

    pub fn github_url(&self) -> &str {
        &self.github_url
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn scope(&self) -> RunScope {
        self.scope
    }

    /// Effective concurrency, never below one.
    pub fn concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or(self.settings.concurrency)
            .max(1)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ssh_key_path(&self) -> Option<&Path> {
        self.ssh_key_path.as_deref()
    }
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("gitlab_user", &self.gitlab_user)
            .field("org", &self.org)
            .field("gitlab_url", &self.gitlab_url)
            .field("dry_run", &self.dry_run)
            .field("scope", &self.scope)
            .field("concurrency", &self.concurrency())
            .field("ssh_key_path", &self.ssh_key_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_override_wins_over_settings() {
        let config = RunnerConfig::new("gh", "gl", "acme", RunScope::Repos);
        assert_eq!(config.concurrency(), 4);

        let config = config.with_concurrency(Some(0));
        assert_eq!(config.concurrency(), 1);

        let config = config.with_concurrency(Some(12));
        assert_eq!(config.concurrency(), 12);
    }

    #[test]
    fn debug_output_hides_tokens() {
        let config = RunnerConfig::new("ghp_secret", "glpat_secret", "acme", RunScope::Issues);
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("Issues"));
    }

    #[test]
    fn scopes_select_pipeline_stages() {
        assert!(RunScope::Repos.creates_repositories());
        assert!(!RunScope::Issues.creates_repositories());
        assert!(RunScope::Issues.migrates_issues());
        assert!(!RunScope::Wikis.migrates_issues());
        assert!(RunScope::Wikis.migrates_wikis());
        assert!(!RunScope::Issues.migrates_wikis());
    }
}
