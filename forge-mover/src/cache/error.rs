//! Cache build error types.

use crate::provider::ProviderError;
use thiserror::Error;

/// A destination fetch failed while building the cache.
///
/// Any of these aborts the build; a partial cache is never used.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to list destination repositories: {0}")]
    Repositories(#[source] ProviderError),

    #[error("Failed to list labels of '{repository}': {source}")]
    Labels {
        repository: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to list issues of '{repository}': {source}")]
    Issues {
        repository: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to list comments of '{repository}#{issue}': {source}")]
    Comments {
        repository: String,
        issue: u64,
        #[source]
        source: ProviderError,
    },
}
