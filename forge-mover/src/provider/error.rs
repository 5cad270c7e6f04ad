//! Provider error types.

use thiserror::Error;

/// Errors raised by provider implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    /// Transport-level HTTP error.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from a provider endpoint.
    #[error("{provider} returned {status} for {endpoint}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        endpoint: String,
        body: String,
    },

    /// The provider asked us to slow down.
    #[error("Rate limit exceeded on {provider} for {endpoint}")]
    RateLimited {
        provider: &'static str,
        endpoint: String,
    },

    /// Response body could not be decoded.
    #[error("Failed to decode {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Repository is not known to the provider.
    #[error("repository {0} does not exist")]
    RepositoryNotFound(String),

    /// Repository name is already taken.
    #[error("repository {0} already exists")]
    RepositoryExists(String),

    /// Issue number is not known within the repository.
    #[error("issue number '{number}' does not exist for {repository}")]
    IssueNotFound { repository: String, number: u64 },

    /// Operation not offered by this provider.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    /// Base URL could not be parsed.
    #[error("Invalid base URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The run was cancelled while the call was waiting to be sent.
    #[error("cancelled while waiting for the {0} rate limit to reset")]
    Cancelled(&'static str),

    /// Any other provider-reported failure.
    #[error("{0}")]
    Api(String),
}

impl ProviderError {
    /// Creates an API error from a message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Classifies a non-success HTTP status into a typed error.
    pub fn from_status(
        provider: &'static str,
        status: reqwest::StatusCode,
        endpoint: impl Into<String>,
        body: &str,
    ) -> Self {
        let endpoint = endpoint.into();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited { provider, endpoint }
        } else {
            Self::Status {
                provider,
                status: status.as_u16(),
                endpoint,
                body: body.to_string(),
            }
        }
    }

    /// Returns true when retrying after a delay may succeed.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::GitHub(octocrab::Error::GitHub { source, .. }) => {
                source.status_code.as_u16() == 429
                    || source.message.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }

    /// Returns true when the provider answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RepositoryNotFound(_) | Self::IssueNotFound { .. } => true,
            Self::Status { status, .. } => *status == 404,
            Self::GitHub(octocrab::Error::GitHub { source, .. }) => {
                source.status_code.as_u16() == 404
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_too_many_requests_as_rate_limited() {
        let err = ProviderError::from_status(
            "GitLab",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "projects",
            "slow down",
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn keeps_status_details_for_other_failures() {
        let err = ProviderError::from_status(
            "GitLab",
            reqwest::StatusCode::NOT_FOUND,
            "projects/7/issues",
            "404 Project Not Found",
        );
        assert!(!err.is_rate_limited());
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "GitLab returned 404 for projects/7/issues: 404 Project Not Found"
        );
    }

    #[test]
    fn issue_not_found_message_names_number_and_repository() {
        let err = ProviderError::IssueNotFound {
            repository: "app".to_string(),
            number: 12,
        };
        assert_eq!(err.to_string(), "issue number '12' does not exist for app");
    }
}
