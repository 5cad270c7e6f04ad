//! Provider-agnostic entities exchanged between source and destination.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// A repository as reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitRepository {
    /// Short repository name, unique within the owning organization.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// HTTPS clone URL.
    pub clone_url: String,

    /// SSH clone URL.
    pub ssh_url: String,

    /// Owning user or namespace login.
    pub owner: String,

    /// Whether the repository is archived.
    pub archived: bool,

    /// Whether the repository is a fork of another project.
    pub fork: bool,

    /// Whether the repository has no commits.
    pub empty: bool,

    /// Provider-internal numeric identifier.
    pub pid: u64,
}

impl GitRepository {
    /// Returns true when the repository should be carried over.
    ///
    /// Forks and repositories without commits are never migrated.
    #[must_use]
    pub fn is_migratable(&self) -> bool {
        !self.fork && !self.empty
    }
}

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    /// Parses a provider state string. GitLab reports `opened`, GitHub `open`.
    #[must_use]
    pub fn from_provider(state: &str) -> Self {
        if state.trim().eq_ignore_ascii_case("closed") {
            Self::Closed
        } else {
            Self::Open
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user, carried for attribution only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitUser {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GitUser {
    /// Creates a user with only a login.
    #[must_use]
    pub fn with_login(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Default::default()
        }
    }

    /// Returns the display name, falling back to the login.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login)
    }
}

/// An issue belonging to one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitIssue {
    /// Name of the owning repository.
    pub repository: String,

    /// Provider-internal identifier of the owning repository.
    pub repository_id: u64,

    /// Issue number within the repository.
    pub number: u64,

    pub title: String,
    pub body: String,
    pub state: IssueState,

    /// Label names, in provider order.
    pub labels: Vec<String>,

    /// Reporting user, when known.
    pub author: Option<GitUser>,

    pub assignees: Vec<GitUser>,
}

/// A comment on an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitIssueComment {
    /// Name of the owning repository.
    pub repository: String,

    /// Number of the issue the comment belongs to.
    pub issue_number: u64,

    pub author: Option<GitUser>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An issue label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitLabel {
    /// Name of the owning repository.
    pub repository: String,

    pub name: String,

    /// Hex color, with or without a leading `#`.
    pub color: String,

    pub description: String,
}

/// Credentials and identity of a provider connection.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthId {
    /// Provider base URL.
    pub url: String,

    /// API token.
    pub token: String,

    /// Organization (destination) or user (source) the connection acts for.
    pub owner: String,

    /// SSH private key used for Git transport, if any.
    pub ssh_key_path: Option<PathBuf>,
}

impl AuthId {
    /// Creates a new identity without an SSH key.
    pub fn new(url: impl Into<String>, token: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            owner: owner.into(),
            ssh_key_path: None,
        }
    }

    /// Sets the SSH key path.
    #[must_use]
    pub fn with_ssh_key_path(mut self, path: Option<PathBuf>) -> Self {
        self.ssh_key_path = path;
        self
    }
}

impl fmt::Debug for AuthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthId")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("ssh_key_path", &self.ssh_key_path)
            .finish()
    }
}

/// Status string of a destination-side repository import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportStatus(String);

/// Import states that will never progress to `complete`.
const FAILED_IMPORT_STATES: &[&str] = &[
    "error",
    "auth_failed",
    "detection_needs_auth",
    "detection_found_nothing",
    "detection_found_multiple",
];

impl ImportStatus {
    pub const COMPLETE: &'static str = "complete";

    /// Wraps a provider status string.
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Status reported once an import has finished.
    #[must_use]
    pub fn complete() -> Self {
        Self::new(Self::COMPLETE)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0 == Self::COMPLETE
    }

    /// Returns true for terminal failure states.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        FAILED_IMPORT_STATES.contains(&self.0.as_str())
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forks_and_empty_repositories_are_not_migratable() {
        let base = GitRepository {
            name: "app".to_string(),
            ..Default::default()
        };
        assert!(base.is_migratable());

        let fork = GitRepository {
            fork: true,
            ..base.clone()
        };
        assert!(!fork.is_migratable());

        let empty = GitRepository {
            empty: true,
            ..base
        };
        assert!(!empty.is_migratable());
    }

    #[test]
    fn parses_provider_issue_states() {
        assert_eq!(IssueState::from_provider("opened"), IssueState::Open);
        assert_eq!(IssueState::from_provider("open"), IssueState::Open);
        assert_eq!(IssueState::from_provider("Closed"), IssueState::Closed);
    }

    #[test]
    fn auth_debug_redacts_token() {
        let auth = AuthId::new("https://gitlab.com", "super-secret", "alice");
        let printed = format!("{auth:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("alice"));
    }

    #[test]
    fn classifies_import_states() {
        assert!(ImportStatus::complete().is_complete());
        assert!(ImportStatus::new("auth_failed").is_failed());
        let importing = ImportStatus::new("importing");
        assert!(!importing.is_complete());
        assert!(!importing.is_failed());
    }

    #[test]
    fn display_name_falls_back_to_login() {
        let mut user = GitUser::with_login("bob");
        assert_eq!(user.display_name(), "bob");
        user.name = Some("Bob Builder".to_string());
        assert_eq!(user.display_name(), "Bob Builder");
    }
}
