//! Diffs source entities against the destination cache and creates what is missing.
//!
//! Every operation here records its own failures and carries on; nothing in
//! this module aborts a run.

use crate::cache::{CachedIssue, CachedRepository, DestinationCache};
use crate::provider::{GitIssue, GitIssueComment, GitLabel, GitProvider, GitRepository};
use crate::summary::{EntityKind, FailureSink, RepositoryReport};
use crate::templates::TemplateRenderer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a source repository stands at the destination.
#[derive(Debug, Clone)]
pub enum RepositoryStatus {
    /// Already present before this run.
    Existing(Arc<CachedRepository>),
    /// Created during this run.
    Created(Arc<CachedRepository>),
    /// Creation failed and was recorded.
    Failed,
}

/// Reconciles one source repository at a time against the destination.
#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn GitProvider>,
    destination: Arc<dyn GitProvider>,
    cache: Arc<DestinationCache>,
    renderer: Arc<TemplateRenderer>,
    failures: FailureSink,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        source: Arc<dyn GitProvider>,
        destination: Arc<dyn GitProvider>,
        cache: Arc<DestinationCache>,
        renderer: Arc<TemplateRenderer>,
        failures: FailureSink,
    ) -> Self {
        Self {
            source,
            destination,
            cache,
            renderer,
            failures,
        }
    }

    /// Returns the cached destination repository, creating it when missing.
    pub async fn ensure_repository(&self, repository: &GitRepository) -> RepositoryStatus {
        if let Some(cached) = self.cache.get(&repository.name) {
            debug!("Repository already at destination");
            return RepositoryStatus::Existing(cached);
        }

        info!("Missing repository, creating it");
        match self.destination.create_repository(repository).await {
            Ok(created) => {
                let cached = self.cache.insert_repository(created);
                RepositoryStatus::Created(cached)
            }
            Err(e) => {
                self.failures.record(
                    EntityKind::Repository,
                    &repository.name,
                    repository.name.as_str(),
                    e,
                );
                RepositoryStatus::Failed
            }
        }
    }

    /// Starts the destination's history import from the source clone URL.
    ///
    /// The source token is the import credential. Returns true if the import
    /// was accepted.
    pub async fn start_import(&self, repository: &GitRepository) -> bool {
        let source_auth = self.source.auth();
        let mut repository = repository.clone();
        if repository.owner.is_empty() {
            repository.owner = source_auth.owner.clone();
        }

        match self
            .destination
            .migrate_repo(&repository, &source_auth.token)
            .await
        {
            Ok(status) => {
                info!(status = %status, "Import started");
                true
            }
            Err(e) => {
                self.failures.record(
                    EntityKind::Import,
                    &repository.name,
                    repository.name.as_str(),
                    e,
                );
                false
            }
        }
    }

    /// Creates every source label whose name is absent at the destination.
    ///
    /// Returns the number of labels created.
    pub async fn reconcile_labels(
        &self,
        repository: &GitRepository,
        cached: &CachedRepository,
    ) -> usize {
        let labels = match self
            .source
            .get_labels(repository.pid, &repository.name)
            .await
        {
            Ok(labels) => labels,
            Err(e) => {
                self.failures
                    .record(EntityKind::Label, &repository.name, "labels", e);
                return 0;
            }
        };

        let mut created = 0;
        for label in labels {
            if cached.has_label(&label.name) {
                continue;
            }
            let request = GitLabel {
                repository: cached.name().to_string(),
                ..label
            };
            match self.destination.create_label(&request).await {
                Ok(label) => {
                    debug!(label = %label.name, "Label created");
                    cached.insert_label(label);
                    created += 1;
                }
                Err(e) => self.failures.record(
                    EntityKind::Label,
                    &repository.name,
                    request.name.as_str(),
                    e,
                ),
            }
        }
        created
    }

    /// Creates missing issues in source order, then their missing comments.
    ///
    /// Comments are reconciled for pre-existing issues too.
    pub async fn reconcile_issues(
        &self,
        repository: &GitRepository,
        cached: &CachedRepository,
        report: &mut RepositoryReport,
    ) {
        let mut issues = match self
            .source
            .get_issues(repository.pid, &repository.name)
            .await
        {
            Ok(issues) => issues,
            Err(e) => {
                self.failures
                    .record(EntityKind::Issue, &repository.name, "issues", e);
                return;
            }
        };
        issues.sort_by_key(|issue| issue.number);

        for issue in &issues {
            let target = match cached.find_issue(issue) {
                Some(existing) => existing,
                None => match self.create_issue(issue, cached).await {
                    Some(created) => {
                        report.issues_created += 1;
                        created
                    }
                    None => continue,
                },
            };
            report.comments_created += self
                .reconcile_comments(repository, issue, &target)
                .await;
        }
    }

    async fn create_issue(
        &self,
        issue: &GitIssue,
        cached: &CachedRepository,
    ) -> Option<Arc<CachedIssue>> {
        let entity = format!("#{}", issue.number);
        let body = match self.renderer.render_issue(issue) {
            Ok(body) => body,
            Err(e) => {
                self.failures
                    .record(EntityKind::Issue, &issue.repository, entity, e);
                return None;
            }
        };
        let request = GitIssue {
            repository: cached.name().to_string(),
            repository_id: cached.repository().pid,
            body,
            ..issue.clone()
        };

        match self.destination.create_issue(&request).await {
            Ok(created) => {
                info!(
                    issue = issue.number,
                    destination = created.number,
                    "Issue created"
                );
                if created.state != issue.state {
                    self.failures.record(
                        EntityKind::Issue,
                        &issue.repository,
                        entity,
                        format!(
                            "created as #{} but left {}, expected {}",
                            created.number, created.state, issue.state
                        ),
                    );
                }
                Some(cached.insert_migrated_issue(issue.number, created))
            }
            Err(e) => {
                self.failures
                    .record(EntityKind::Issue, &issue.repository, entity, e);
                None
            }
        }
    }

    /// Posts the source comments of `issue` missing from `target`, oldest first.
    ///
    /// Returns the number of comments created.
    async fn reconcile_comments(
        &self,
        repository: &GitRepository,
        issue: &GitIssue,
        target: &CachedIssue,
    ) -> usize {
        let entity = || format!("#{} comments", issue.number);
        let mut comments = match self
            .source
            .get_comments(repository.pid, issue.number, &repository.name)
            .await
        {
            Ok(comments) => comments,
            Err(e) => {
                self.failures
                    .record(EntityKind::Comment, &repository.name, entity(), e);
                return 0;
            }
        };
        comments.sort_by_key(|comment| comment.created_at);

        let mut created = 0;
        for comment in comments {
            let key = comment.created_at;
            if target.has_comment(&key) {
                continue;
            }
            let body = match self.renderer.render_comment(&comment) {
                Ok(body) => body,
                Err(e) => {
                    self.failures
                        .record(EntityKind::Comment, &repository.name, entity(), e);
                    continue;
                }
            };
            let request = GitIssueComment {
                repository: target.issue().repository.clone(),
                issue_number: target.number(),
                body,
                ..comment
            };
            match self.destination.create_issue_comment(&request).await {
                Ok(()) => {
                    target.insert_migrated_comment(key, request);
                    created += 1;
                }
                Err(e) => {
                    warn!(issue = issue.number, created_at = %key, "Comment not migrated");
                    self.failures
                        .record(EntityKind::Comment, &repository.name, entity(), e);
                }
            }
        }
        created
    }
}
