//! Cached destination repositories and issues.

use crate::provider::{GitIssue, GitIssueComment, GitLabel, GitRepository};
use crate::templates::{parse_comment_marker, parse_issue_marker};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Key identifying a comment within its issue.
///
/// Comments migrated by us carry their source creation time in a marker;
/// anything else is keyed by its own creation time.
#[must_use]
pub fn comment_key(comment: &GitIssueComment) -> DateTime<Utc> {
    parse_comment_marker(&comment.body).unwrap_or(comment.created_at)
}

/// A destination issue with its comments.
#[derive(Debug)]
pub struct CachedIssue {
    issue: GitIssue,
    comments: RwLock<HashMap<DateTime<Utc>, GitIssueComment>>,
}

impl CachedIssue {
    /// Wraps a destination issue with no comments.
    #[must_use]
    pub fn new(issue: GitIssue) -> Self {
        Self {
            issue,
            comments: RwLock::new(HashMap::new()),
        }
    }

    /// The destination issue.
    #[must_use]
    pub fn issue(&self) -> &GitIssue {
        &self.issue
    }

    /// Destination issue number.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.issue.number
    }

    /// Returns true if a comment with this key is present.
    #[must_use]
    pub fn has_comment(&self, key: &DateTime<Utc>) -> bool {
        read(&self.comments).contains_key(key)
    }

    /// Records a destination comment under its [`comment_key`].
    pub fn insert_comment(&self, comment: GitIssueComment) {
        let key = comment_key(&comment);
        write(&self.comments).insert(key, comment);
    }

    /// Records a comment we just created from a source comment created at `key`.
    pub fn insert_migrated_comment(&self, key: DateTime<Utc>, comment: GitIssueComment) {
        write(&self.comments).insert(key, comment);
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        read(&self.comments).len()
    }
}

#[derive(Debug, Default)]
struct IssueIndex {
    /// Issues carrying a source-number marker.
    by_source: HashMap<u64, Arc<CachedIssue>>,
    /// Issues without a marker, keyed by title.
    by_title: HashMap<String, Arc<CachedIssue>>,
}

/// A destination repository with its labels and issues.
#[derive(Debug)]
pub struct CachedRepository {
    repository: GitRepository,
    labels: RwLock<HashMap<String, GitLabel>>,
    issues: RwLock<IssueIndex>,
}

impl CachedRepository {
    /// Wraps a destination repository with no labels or issues.
    #[must_use]
    pub fn new(repository: GitRepository) -> Self {
        Self {
            repository,
            labels: RwLock::new(HashMap::new()),
            issues: RwLock::new(IssueIndex::default()),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &GitRepository {
        &self.repository
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.repository.name
    }

    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        read(&self.labels).contains_key(name)
    }

    pub fn insert_label(&self, label: GitLabel) {
        write(&self.labels).insert(label.name.clone(), label);
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        read(&self.labels).len()
    }

    /// Finds the destination counterpart of a source issue.
    ///
    /// Issues migrated by us are matched on source number; others on title.
    #[must_use]
    pub fn find_issue(&self, source: &GitIssue) -> Option<Arc<CachedIssue>> {
        let index = read(&self.issues);
        index
            .by_source
            .get(&source.number)
            .or_else(|| index.by_title.get(&source.title))
            .cloned()
    }

    /// Indexes a destination issue loaded from the provider.
    pub fn insert_issue(&self, issue: GitIssue) -> Arc<CachedIssue> {
        let source_number = parse_issue_marker(&issue.body);
        let title = issue.title.clone();
        let cached = Arc::new(CachedIssue::new(issue));
        let mut index = write(&self.issues);
        match source_number {
            Some(number) => index.by_source.insert(number, Arc::clone(&cached)),
            None => index.by_title.insert(title, Arc::clone(&cached)),
        };
        cached
    }

    /// Indexes an issue just created from source issue `source_number`.
    pub fn insert_migrated_issue(&self, source_number: u64, issue: GitIssue) -> Arc<CachedIssue> {
        let cached = Arc::new(CachedIssue::new(issue));
        write(&self.issues)
            .by_source
            .insert(source_number, Arc::clone(&cached));
        cached
    }

    #[must_use]
    pub fn issue_count(&self) -> usize {
        let index = read(&self.issues);
        index.by_source.len() + index.by_title.len()
    }
}
