//! Per-repository processing report.

use crate::wiki::WikiOutcome;

/// What happened to one source repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryReport {
    /// Repository name.
    pub repository: String,

    /// The repository was created at the destination during this run.
    pub created: bool,

    /// A history import was started.
    pub import_started: bool,

    /// The repository was not processed (missing at the destination for
    /// scopes that do not create repositories, or creation failed).
    pub skipped: bool,

    pub labels_created: usize,
    pub issues_created: usize,
    pub comments_created: usize,

    /// Outcome of the wiki transfer, when one ran successfully.
    pub wiki: Option<WikiOutcome>,
}

impl RepositoryReport {
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    /// A report for a repository that was not processed.
    #[must_use]
    pub fn skipped(repository: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::new(repository)
        }
    }
}
