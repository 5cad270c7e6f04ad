//! GitLab source provider.
//!
//! Talks to the GitLab v4 REST API with `reqwest`. Listing endpoints are
//! depaginated by following the `x-next-page` header. GitLab is only ever the
//! migration source, so write operations report [`ProviderError::Unsupported`].

mod convert;
mod types;

use crate::provider::{
    AuthId, GitIssue, GitIssueComment, GitLabel, GitProvider, GitRepository, ImportStatus,
    ProviderError,
};
use crate::retry::{with_retry_config, RetryConfig};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use types::{GitLabIssue, GitLabLabel, GitLabNote, GitLabProject};
use url::Url;

const PROVIDER: &str = "GitLab";

/// Default SaaS endpoint.
pub const GITLAB_COM: &str = "https://gitlab.com";

/// Page size requested from listing endpoints (GitLab's maximum).
const PER_PAGE: u32 = 100;

/// Returns true when `url` points at gitlab.com (or is unset).
#[must_use]
pub fn is_hosted(url: &str) -> bool {
    let url = url.trim().trim_end_matches('/');
    url.is_empty() || url == "https://gitlab.com" || url == "http://gitlab.com"
}

/// GitLab client implementing [`GitProvider`].
#[derive(Debug, Clone)]
pub struct GitlabProvider {
    client: reqwest::Client,
    api_base: Url,
    auth: AuthId,
    retry: RetryConfig,
}

impl GitlabProvider {
    /// Creates a provider for `auth.url`, or gitlab.com when that is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(mut auth: AuthId) -> Result<Self, ProviderError> {
        if is_hosted(&auth.url) {
            auth.url = GITLAB_COM.to_string();
        }
        let api_base = api_base(&auth.url)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("forge-mover/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base,
            auth,
            retry: RetryConfig::default(),
        })
    }

    /// Overrides the backoff used for rate-limited requests.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the resolved API root (`.../api/v4/`).
    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Fetches every page of a listing endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ProviderError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let (batch, next_page) = with_retry_config(
                || self.get_page::<T>(path, query, page),
                path,
                self.retry.clone().into_backoff(),
            )
            .await?;
            debug!(endpoint = path, page, count = batch.len(), "Fetched page");
            items.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<(Vec<T>, Option<u32>), ProviderError> {
        let url = self
            .api_base
            .join(path)
            .map_err(|source| ProviderError::InvalidUrl {
                url: path.to_string(),
                source,
            })?;

        let response = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.auth.token)
            .query(query)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .send()
            .await?;

        let status = response.status();
        let next_page = response
            .headers()
            .get("x-next-page")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u32>().ok());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::from_status(PROVIDER, status, path, &body));
        }

        let batch = serde_json::from_str(&body).map_err(|source| ProviderError::Decode {
            endpoint: path.to_string(),
            source,
        })?;
        Ok((batch, next_page))
    }

    fn unsupported(operation: &'static str) -> ProviderError {
        ProviderError::Unsupported {
            provider: PROVIDER,
            operation,
        }
    }
}

/// Resolves `{base}/api/v4/`, keeping any path prefix of a self-hosted instance.
fn api_base(base: &str) -> Result<Url, ProviderError> {
    let mut normalized = base.trim().trim_end_matches('/').to_string();
    normalized.push('/');
    Url::parse(&normalized)
        .and_then(|url| url.join("api/v4/"))
        .map_err(|source| ProviderError::InvalidUrl {
            url: base.to_string(),
            source,
        })
}

#[async_trait]
impl GitProvider for GitlabProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn auth(&self) -> &AuthId {
        &self.auth
    }

    async fn get_repositories(&self) -> Result<Vec<GitRepository>, ProviderError> {
        let projects: Vec<GitLabProject> = self
            .get_all(
                "projects",
                &[
                    ("membership", "true"),
                    ("statistics", "true"),
                    ("order_by", "id"),
                    ("sort", "asc"),
                ],
            )
            .await?;
        Ok(projects.into_iter().map(convert::to_repository).collect())
    }

    async fn get_issues(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssue>, ProviderError> {
        let path = format!("projects/{repository_id}/issues");
        let issues: Vec<GitLabIssue> = self
            .get_all(
                &path,
                &[("scope", "all"), ("order_by", "created_at"), ("sort", "asc")],
            )
            .await?;
        Ok(issues
            .into_iter()
            .map(|issue| convert::to_issue(issue, repository_name, repository_id))
            .collect())
    }

    async fn get_comments(
        &self,
        repository_id: u64,
        issue_number: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssueComment>, ProviderError> {
        let path = format!("projects/{repository_id}/issues/{issue_number}/notes");
        let notes: Vec<GitLabNote> = self
            .get_all(&path, &[("order_by", "created_at"), ("sort", "asc")])
            .await?;
        Ok(notes
            .into_iter()
            .filter(|note| !note.system)
            .map(|note| convert::to_comment(note, repository_name, issue_number))
            .collect())
    }

    async fn get_labels(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitLabel>, ProviderError> {
        let path = format!("projects/{repository_id}/labels");
        let labels: Vec<GitLabLabel> = self.get_all(&path, &[]).await?;
        Ok(labels
            .into_iter()
            .map(|label| convert::to_label(label, repository_name))
            .collect())
    }

    async fn create_repository(
        &self,
        _repository: &GitRepository,
    ) -> Result<GitRepository, ProviderError> {
        Err(Self::unsupported("creating repositories"))
    }

    async fn create_issue(&self, _issue: &GitIssue) -> Result<GitIssue, ProviderError> {
        Err(Self::unsupported("creating issues"))
    }

    async fn create_issue_comment(
        &self,
        _comment: &GitIssueComment,
    ) -> Result<(), ProviderError> {
        Err(Self::unsupported("creating issue comments"))
    }

    async fn create_label(&self, _label: &GitLabel) -> Result<GitLabel, ProviderError> {
        Err(Self::unsupported("creating labels"))
    }

    async fn migrate_repo(
        &self,
        _repository: &GitRepository,
        _auth_token: &str,
    ) -> Result<ImportStatus, ProviderError> {
        Err(Self::unsupported("repository imports"))
    }

    async fn get_import_progress(
        &self,
        _repository_name: &str,
    ) -> Result<ImportStatus, ProviderError> {
        Err(Self::unsupported("repository imports"))
    }
}
