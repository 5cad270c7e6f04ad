//! GitHub destination provider.
//!
//! Built on `octocrab`. Repositories are created private inside the configured
//! organization, and history is brought over with GitHub's source import API.

mod convert;

use crate::provider::{
    AuthId, GitIssue, GitIssueComment, GitLabel, GitProvider, GitRepository, GitUser,
    ImportStatus, IssueState, ProviderError,
};
use crate::rate_limit::ensure_core_rate_limit;
use async_trait::async_trait;
use octocrab::{models, params, Octocrab};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PROVIDER: &str = "GitHub";

/// Public GitHub web URL.
pub const GITHUB_COM: &str = "https://github.com";

/// Page size requested from listing endpoints.
const PER_PAGE: u8 = 100;

#[derive(Debug, Serialize)]
struct CreateRepositoryRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    has_issues: bool,
    has_wiki: bool,
}

#[derive(Debug, Serialize)]
struct StartImportRequest<'a> {
    vcs: &'a str,
    vcs_url: &'a str,
    vcs_username: &'a str,
    vcs_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    status: String,
}

/// GitHub organization client implementing [`GitProvider`].
pub struct GithubProvider {
    octocrab: Octocrab,
    auth: AuthId,
    members: OnceCell<HashSet<String>>,
    cancel: CancellationToken,
}

impl GithubProvider {
    /// Creates a provider acting on organization `auth.owner` with `auth.token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the GitHub client cannot be built.
    pub fn new(auth: AuthId) -> Result<Self, ProviderError> {
        let octocrab = Octocrab::builder()
            .personal_token(auth.token.clone())
            .build()?;
        Ok(Self::with_octocrab(octocrab, auth))
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn with_octocrab(octocrab: Octocrab, mut auth: AuthId) -> Self {
        if auth.url.is_empty() {
            auth.url = GITHUB_COM.to_string();
        }
        Self {
            octocrab,
            auth,
            members: OnceCell::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abandon rate-limit waits when the run is stopped.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn ensure_rate_limit(&self) -> Result<(), ProviderError> {
        ensure_core_rate_limit(&self.octocrab, &self.cancel).await
    }

    fn org(&self) -> &str {
        &self.auth.owner
    }

    /// Logins of the organization's members, fetched once.
    async fn members(&self) -> Result<&HashSet<String>, ProviderError> {
        self.members
            .get_or_try_init(|| async {
                let page = self
                    .octocrab
                    .orgs(self.org())
                    .list_members()
                    .per_page(PER_PAGE)
                    .send()
                    .await?;
                let members = self.octocrab.all_pages(page).await?;
                debug!(org = %self.org(), count = members.len(), "Loaded organization members");
                Ok::<_, ProviderError>(members.into_iter().map(|m| m.login).collect())
            })
            .await
    }

    /// Keeps only assignees that can be assigned in the organization.
    async fn assignable(&self, assignees: &[GitUser]) -> Result<Vec<String>, ProviderError> {
        if assignees.is_empty() {
            return Ok(Vec::new());
        }
        let members = self.members().await?;
        Ok(assignees
            .iter()
            .filter(|user| members.contains(&user.login))
            .map(|user| user.login.clone())
            .collect())
    }

    async fn close_issue(&self, repository: &str, number: u64) -> Result<(), ProviderError> {
        self.ensure_rate_limit().await?;
        self.octocrab
            .issues(self.org(), repository)
            .update(number)
            .state(models::IssueState::Closed)
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GitProvider for GithubProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn auth(&self) -> &AuthId {
        &self.auth
    }

    async fn get_repositories(&self) -> Result<Vec<GitRepository>, ProviderError> {
        let page = self
            .octocrab
            .orgs(self.org())
            .list_repos()
            .per_page(PER_PAGE)
            .send()
            .await?;
        let repos = self.octocrab.all_pages(page).await?;
        Ok(repos.into_iter().map(convert::to_repository).collect())
    }

    async fn get_issues(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssue>, ProviderError> {
        let page = self
            .octocrab
            .issues(self.org(), repository_name)
            .list()
            .state(params::State::All)
            .per_page(PER_PAGE)
            .send()
            .await?;
        let issues = self.octocrab.all_pages(page).await?;
        Ok(issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| convert::to_issue(issue, repository_name, repository_id))
            .collect())
    }

    async fn get_comments(
        &self,
        _repository_id: u64,
        issue_number: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssueComment>, ProviderError> {
        let page = self
            .octocrab
            .issues(self.org(), repository_name)
            .list_comments(issue_number)
            .per_page(PER_PAGE)
            .send()
            .await?;
        let comments = self.octocrab.all_pages(page).await?;
        Ok(comments
            .into_iter()
            .map(|comment| convert::to_comment(comment, repository_name, issue_number))
            .collect())
    }

    async fn get_labels(
        &self,
        _repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitLabel>, ProviderError> {
        let page = self
            .octocrab
            .issues(self.org(), repository_name)
            .list_labels_for_repo()
            .per_page(PER_PAGE)
            .send()
            .await?;
        let labels = self.octocrab.all_pages(page).await?;
        Ok(labels
            .into_iter()
            .map(|label| convert::to_label(label, repository_name))
            .collect())
    }

    async fn create_repository(
        &self,
        repository: &GitRepository,
    ) -> Result<GitRepository, ProviderError> {
        let name = repository.name.trim();

        match self.octocrab.repos(self.org(), name).get().await {
            Ok(existing) => {
                debug!(repo = %name, "Repository already exists, reusing it");
                return Ok(convert::to_repository(existing));
            }
            Err(e) => {
                let e = ProviderError::from(e);
                if !e.is_not_found() {
                    return Err(e);
                }
            }
        }

        self.ensure_rate_limit().await?;
        let request = CreateRepositoryRequest {
            name,
            description: repository.description.trim(),
            private: true,
            has_issues: true,
            has_wiki: true,
        };
        let created: models::Repository = self
            .octocrab
            .post(format!("/orgs/{}/repos", self.org()), Some(&request))
            .await?;
        info!(repo = %name, org = %self.org(), "Created repository");
        Ok(convert::to_repository(created))
    }

    async fn create_issue(&self, issue: &GitIssue) -> Result<GitIssue, ProviderError> {
        let assignees = self.assignable(&issue.assignees).await?;

        self.ensure_rate_limit().await?;
        let handler = self.octocrab.issues(self.org(), &issue.repository);
        let mut builder = handler.create(issue.title.trim()).body(issue.body.trim());
        if !issue.labels.is_empty() {
            builder = builder.labels(issue.labels.clone());
        }
        if !assignees.is_empty() {
            builder = builder.assignees(assignees);
        }
        let created = builder.send().await?;
        let number = created.number;
        let mut result = convert::to_issue(created, &issue.repository, issue.repository_id);

        // The issue exists from here on; a failed close leaves it open.
        if issue.state == IssueState::Closed {
            match self.close_issue(&issue.repository, number).await {
                Ok(()) => result.state = IssueState::Closed,
                Err(e) => warn!(issue = number, error = %e, "Created issue could not be closed"),
            }
        }
        Ok(result)
    }

    async fn create_issue_comment(&self, comment: &GitIssueComment) -> Result<(), ProviderError> {
        self.ensure_rate_limit().await?;
        self.octocrab
            .issues(self.org(), &comment.repository)
            .create_comment(comment.issue_number, comment.body.trim())
            .await?;
        Ok(())
    }

    async fn create_label(&self, label: &GitLabel) -> Result<GitLabel, ProviderError> {
        self.ensure_rate_limit().await?;
        let created = self
            .octocrab
            .issues(self.org(), &label.repository)
            .create_label(
                label.name.trim(),
                convert::normalize_color(&label.color),
                label.description.trim(),
            )
            .await?;
        Ok(convert::to_label(created, &label.repository))
    }

    async fn migrate_repo(
        &self,
        repository: &GitRepository,
        auth_token: &str,
    ) -> Result<ImportStatus, ProviderError> {
        self.ensure_rate_limit().await?;
        let request = StartImportRequest {
            vcs: "git",
            vcs_url: &repository.clone_url,
            vcs_username: &repository.owner,
            vcs_password: auth_token,
        };
        let response: ImportResponse = self
            .octocrab
            .put(
                format!("/repos/{}/{}/import", self.org(), repository.name),
                Some(&request),
            )
            .await?;
        Ok(ImportStatus::new(response.status))
    }

    async fn get_import_progress(
        &self,
        repository_name: &str,
    ) -> Result<ImportStatus, ProviderError> {
        let response: ImportResponse = self
            .octocrab
            .get(
                format!("/repos/{}/{}/import", self.org(), repository_name),
                None::<&()>,
            )
            .await?;
        Ok(ImportStatus::new(response.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_request_uses_git_vcs() {
        let request = StartImportRequest {
            vcs: "git",
            vcs_url: "https://gitlab.com/alice/app.git",
            vcs_username: "alice",
            vcs_password: "glpat",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["vcs"], "git");
        assert_eq!(json["vcs_username"], "alice");
    }

    #[test]
    fn create_request_is_private() {
        let request = CreateRepositoryRequest {
            name: "app",
            description: "",
            private: true,
            has_issues: true,
            has_wiki: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["private"], true);
    }
}
