//! Snapshot of the destination's existing state.
//!
//! The cache is filled once, before any reconciliation decision, and then
//! answers existence checks for repositories, labels, issues and comments.
//! New entities created during the run are inserted by the worker that owns
//! the repository.

mod entry;
mod error;

pub use entry::{comment_key, CachedIssue, CachedRepository};
pub use error::CacheError;

use crate::provider::{GitIssue, GitIssueComment, GitProvider, GitRepository};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, info_span, Instrument};

/// In-memory index of destination repositories.
#[derive(Debug, Default)]
pub struct DestinationCache {
    repositories: RwLock<HashMap<String, Arc<CachedRepository>>>,
}

impl DestinationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulls the full repository, label, issue and comment inventory.
    ///
    /// Labels and issues of each repository are fetched concurrently, then
    /// comments of every issue. At most `concurrency` repositories, and per
    /// repository `concurrency` issues, are in flight at once.
    ///
    /// # Errors
    ///
    /// Returns the first fetch failure; no partial cache is returned.
    pub async fn load(
        provider: &dyn GitProvider,
        concurrency: usize,
    ) -> Result<Self, CacheError> {
        let concurrency = concurrency.max(1);
        let span = info_span!("load_cache", provider = %provider.name());

        async {
            let repositories = provider
                .get_repositories()
                .await
                .map_err(CacheError::Repositories)?;
            info!(count = repositories.len(), "Caching destination repositories");

            let loaded: Vec<CachedRepository> = stream::iter(repositories)
                .map(|repository| load_repository(provider, repository, concurrency))
                .buffer_unordered(concurrency)
                .try_collect()
                .await?;

            let cache = Self::new();
            {
                let mut map = cache
                    .repositories
                    .write()
                    .unwrap_or_else(|e| e.into_inner());
                for repository in loaded {
                    map.insert(repository.name().to_string(), Arc::new(repository));
                }
            }
            info!(count = cache.len(), "Destination cache ready");
            Ok(cache)
        }
        .instrument(span)
        .await
    }

    /// Looks up a repository by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CachedRepository>> {
        self.repositories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Adds a repository created during the run, returning the cached entry.
    ///
    /// An existing entry with the same name is kept.
    pub fn insert_repository(&self, repository: GitRepository) -> Arc<CachedRepository> {
        let mut map = self
            .repositories
            .write()
            .unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            map.entry(repository.name.clone())
                .or_insert_with(|| Arc::new(CachedRepository::new(repository))),
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.repositories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

async fn load_repository(
    provider: &dyn GitProvider,
    repository: GitRepository,
    concurrency: usize,
) -> Result<CachedRepository, CacheError> {
    let name = repository.name.as_str();
    let pid = repository.pid;

    let (labels, issues) = tokio::try_join!(
        async {
            provider
                .get_labels(pid, name)
                .await
                .map_err(|source| CacheError::Labels {
                    repository: name.to_string(),
                    source,
                })
        },
        async {
            provider
                .get_issues(pid, name)
                .await
                .map_err(|source| CacheError::Issues {
                    repository: name.to_string(),
                    source,
                })
        },
    )?;

    let threads: Vec<(GitIssue, Vec<GitIssueComment>)> = stream::iter(issues)
        .map(|issue| async move {
            let comments = provider
                .get_comments(pid, issue.number, name)
                .await
                .map_err(|source| CacheError::Comments {
                    repository: name.to_string(),
                    issue: issue.number,
                    source,
                })?;
            Ok::<_, CacheError>((issue, comments))
        })
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;

    let cached = CachedRepository::new(repository.clone());
    for label in labels {
        cached.insert_label(label);
    }
    for (issue, comments) in threads {
        let entry = cached.insert_issue(issue);
        for comment in comments {
            entry.insert_comment(comment);
        }
    }
    debug!(
        repo = %cached.name(),
        labels = cached.label_count(),
        issues = cached.issue_count(),
        "Cached repository"
    );
    Ok(cached)
}
