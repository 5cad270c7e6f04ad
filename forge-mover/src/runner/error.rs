//! Runner error types.

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::templates::TemplateError;

/// Fatal errors that stop a run before or while reading inventories.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("a GitHub token is required (--github-token or GITHUB_TOKEN)")]
    MissingGithubToken,

    #[error("a GitLab token is required (--gitlab-token or GITLAB_TOKEN)")]
    MissingGitlabToken,

    #[error("a destination organization is required (--org or GHORG)")]
    MissingOrganization,

    /// Settings file errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Attribution template errors.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Provider client construction errors.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Listing source repositories failed.
    #[error("failed to list source repositories: {0}")]
    Source(#[source] ProviderError),

    /// Building the destination cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
