//! Capability interface shared by every Git hosting provider.
//!
//! Orchestration code only ever talks to [`GitProvider`]; the GitHub,
//! GitLab and in-memory implementations plug in behind it.

mod error;
pub mod fake;
mod types;

pub use error::ProviderError;
pub use fake::{FakeCall, FakeFailure, FakeProvider};
pub use types::{
    AuthId, GitIssue, GitIssueComment, GitLabel, GitRepository, GitUser, ImportStatus, IssueState,
};

use async_trait::async_trait;

/// Read and write operations the migration needs from a provider.
///
/// List operations return the complete, depaginated inventory.
#[async_trait]
pub trait GitProvider: Send + Sync {
    /// Human-readable provider name, used in logs.
    fn name(&self) -> &str;

    /// Returns the credentials this provider was built with.
    fn auth(&self) -> &AuthId;

    /// Lists every repository visible to the configured owner.
    async fn get_repositories(&self) -> Result<Vec<GitRepository>, ProviderError>;

    /// Lists all issues of a repository, closed ones included.
    async fn get_issues(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssue>, ProviderError>;

    /// Lists the comments of one issue.
    async fn get_comments(
        &self,
        repository_id: u64,
        issue_number: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssueComment>, ProviderError>;

    /// Lists the labels defined on a repository.
    async fn get_labels(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitLabel>, ProviderError>;

    /// Creates a repository.
    ///
    /// Callers check existence first. Creating a name that already exists
    /// either fails or returns the existing repository, depending on the provider.
    async fn create_repository(
        &self,
        repository: &GitRepository,
    ) -> Result<GitRepository, ProviderError>;

    /// Creates an issue and returns it with its destination number.
    async fn create_issue(&self, issue: &GitIssue) -> Result<GitIssue, ProviderError>;

    /// Posts a comment on the issue named by `comment.issue_number`.
    async fn create_issue_comment(&self, comment: &GitIssueComment) -> Result<(), ProviderError>;

    /// Creates a label.
    async fn create_label(&self, label: &GitLabel) -> Result<GitLabel, ProviderError>;

    /// Starts an asynchronous import of `repository`'s history.
    ///
    /// `auth_token` authenticates the destination against the source's clone URL.
    async fn migrate_repo(
        &self,
        repository: &GitRepository,
        auth_token: &str,
    ) -> Result<ImportStatus, ProviderError>;

    /// Reports the status of a previously started import.
    async fn get_import_progress(
        &self,
        repository_name: &str,
    ) -> Result<ImportStatus, ProviderError>;
}
