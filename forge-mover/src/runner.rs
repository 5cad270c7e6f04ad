//! Orchestrates a migration run.
//!
//! A run lists the source inventory, snapshots the destination, then fans
//! per-repository units out over a bounded stream. Import trackers run as
//! separate tasks; their handles come back over a channel and are joined
//! after every unit has finished.

mod config;
mod error;

pub use config::{RunScope, RunnerConfig};
pub use error::RunnerError;

use crate::cache::{CachedRepository, DestinationCache};
use crate::github::GithubProvider;
use crate::gitlab::GitlabProvider;
use crate::import::{ImportOutcome, ImportTracker};
use crate::provider::{AuthId, FakeProvider, GitProvider, GitRepository};
use crate::reconcile::{Reconciler, RepositoryStatus};
use crate::summary::{failure_channel, EntityKind, FailureSink, RepositoryReport, RunSummary};
use crate::templates::TemplateRenderer;
use crate::wiki::{DryRunWikiTransfer, GitWikiTransfer, WikiTransfer};
use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs migrations between a source and a destination provider.
pub struct Runner {
    config: RunnerConfig,
    source: Arc<dyn GitProvider>,
    destination: Arc<dyn GitProvider>,
    wiki: Arc<dyn WikiTransfer>,
    renderer: Arc<TemplateRenderer>,
    cancel: CancellationToken,
}

impl Runner {
    /// Builds the GitLab source and the GitHub destination from `config`.
    ///
    /// In dry-run mode the destination is an empty [`FakeProvider`] and wikis
    /// are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if a token or the organization is missing, the
    /// settings are invalid, or a client can't be built.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        if config.github_token().trim().is_empty() {
            return Err(RunnerError::MissingGithubToken);
        }
        if config.gitlab_token().trim().is_empty() {
            return Err(RunnerError::MissingGitlabToken);
        }
        if config.org().trim().is_empty() && !config.dry_run() {
            return Err(RunnerError::MissingOrganization);
        }
        config.settings().validate()?;

        let ssh_key = config.ssh_key_path().map(ToOwned::to_owned);
        let source_auth = AuthId::new(
            config.gitlab_url(),
            config.gitlab_token(),
            config.gitlab_user(),
        )
        .with_ssh_key_path(ssh_key.clone());
        let destination_owner = match config.org().trim() {
            "" => "dry-run",
            org => org,
        };
        let destination_auth = AuthId::new(
            config.github_url(),
            config.github_token(),
            destination_owner,
        )
        .with_ssh_key_path(ssh_key);

        let cancel = CancellationToken::new();
        let source: Arc<dyn GitProvider> = Arc::new(GitlabProvider::new(source_auth)?);
        let (destination, wiki): (Arc<dyn GitProvider>, Arc<dyn WikiTransfer>) =
            if config.dry_run() {
                (
                    Arc::new(FakeProvider::with_auth(destination_auth).named("dry-run")),
                    Arc::new(DryRunWikiTransfer),
                )
            } else {
                (
                    Arc::new(
                        GithubProvider::new(destination_auth)?.with_cancellation(cancel.clone()),
                    ),
                    Arc::new(GitWikiTransfer),
                )
            };

        Ok(Self::with_providers(config, source, destination, wiki)?.with_cancellation(cancel))
    }

    /// Builds a runner around existing providers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured templates don't compile.
    pub fn with_providers(
        config: RunnerConfig,
        source: Arc<dyn GitProvider>,
        destination: Arc<dyn GitProvider>,
        wiki: Arc<dyn WikiTransfer>,
    ) -> Result<Self, RunnerError> {
        let renderer = Arc::new(config.settings().renderer()?);
        Ok(Self {
            config,
            source,
            destination,
            wiki,
            renderer,
            cancel: CancellationToken::new(),
        })
    }

    /// Uses `cancel` to stop dispatching new repositories.
    ///
    /// Providers built by [`Runner::new`] keep the token they were given, so
    /// prefer [`Runner::cancellation_token`] there.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run from dispatching further work.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Executes the full orchestration flow.
    ///
    /// Per-entity failures end up in [`RunSummary::failures`]; only setup,
    /// source-listing and cache errors are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the source inventory or destination cache can't be read.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::new(self.config.dry_run());
        let concurrency = self.config.concurrency();
        let scope = self.config.scope();
        info!(
            scope = %scope,
            dry_run = self.config.dry_run(),
            concurrency,
            source = %self.source.name(),
            destination = %self.destination.name(),
            "Starting migration"
        );

        let repositories = self
            .source
            .get_repositories()
            .await
            .map_err(RunnerError::Source)?;
        info!(count = repositories.len(), "Found source repositories");
        summary.repositories_discovered = repositories.len();

        let cache = Arc::new(DestinationCache::load(self.destination.as_ref(), concurrency).await?);

        let (eligible, excluded): (Vec<_>, Vec<_>) = repositories
            .into_iter()
            .partition(GitRepository::is_migratable);
        for repository in &excluded {
            info!(
                repo = %repository.name,
                fork = repository.fork,
                empty = repository.empty,
                "Skipping repository"
            );
        }
        summary.repositories_skipped += excluded.len();

        let (failures, mut failure_log) = failure_channel();
        let (imports_tx, mut imports_rx) = mpsc::unbounded_channel();
        let unit = RepositoryUnit {
            scope,
            reconciler: Reconciler::new(
                Arc::clone(&self.source),
                Arc::clone(&self.destination),
                Arc::clone(&cache),
                Arc::clone(&self.renderer),
                failures.clone(),
            ),
            cache,
            tracker: ImportTracker::new(
                Arc::clone(&self.destination),
                self.config.settings().import_policy(),
                self.cancel.clone(),
                failures.clone(),
            ),
            imports: imports_tx,
            wiki: Arc::clone(&self.wiki),
            source_auth: self.source.auth().clone(),
            destination_auth: self.destination.auth().clone(),
            failures: failures.clone(),
        };

        let cancel = self.cancel.clone();
        let reports: Vec<RepositoryReport> = stream::iter(eligible)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|repository| {
                let unit = unit.clone();
                let failures = failures.clone();
                async move {
                    let name = repository.name.clone();
                    let span = info_span!("repository", repo = %name);
                    match tokio::spawn(unit.run(repository).instrument(span)).await {
                        Ok(report) => report,
                        Err(e) => {
                            failures.record(
                                EntityKind::Repository,
                                &name,
                                name.as_str(),
                                format!("worker task failed: {e}"),
                            );
                            RepositoryReport::new(name)
                        }
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        drop(unit);

        for report in &reports {
            summary.record_report(report);
        }

        while let Some((repository, handle)) = imports_rx.recv().await {
            match handle.await {
                Ok(outcome) => summary.record_import(&outcome),
                Err(e) => failures.record(
                    EntityKind::Import,
                    &repository,
                    repository.as_str(),
                    format!("tracker task failed: {e}"),
                ),
            }
        }

        summary.failures = failure_log.drain();
        for failure in &summary.failures {
            error!(
                kind = %failure.kind,
                repo = %failure.repository,
                entity = %failure.entity,
                error = %failure.error,
                "Migration failure"
            );
        }
        summary.cancelled = self.cancel.is_cancelled();
        if summary.cancelled {
            warn!("Run was cancelled before every repository was dispatched");
        }
        info!(
            processed = reports.len(),
            failures = summary.failures.len(),
            "Migration finished"
        );
        Ok(summary)
    }
}

/// Everything one repository's worker needs.
#[derive(Clone)]
struct RepositoryUnit {
    scope: RunScope,
    reconciler: Reconciler,
    cache: Arc<DestinationCache>,
    tracker: ImportTracker,
    imports: mpsc::UnboundedSender<(String, JoinHandle<ImportOutcome>)>,
    wiki: Arc<dyn WikiTransfer>,
    source_auth: AuthId,
    destination_auth: AuthId,
    failures: FailureSink,
}

impl RepositoryUnit {
    async fn run(self, repository: GitRepository) -> RepositoryReport {
        let mut report = RepositoryReport::new(repository.name.as_str());

        let Some(cached) = self.destination_repository(&repository, &mut report).await else {
            report.skipped = true;
            return report;
        };

        if self.scope.migrates_issues() {
            report.labels_created = self.reconciler.reconcile_labels(&repository, &cached).await;
            self.reconciler
                .reconcile_issues(&repository, &cached, &mut report)
                .await;
        }

        if self.scope.migrates_wikis() {
            match self
                .wiki
                .transfer(&repository, &self.source_auth, &self.destination_auth)
                .await
            {
                Ok(outcome) => report.wiki = Some(outcome),
                Err(e) => self
                    .failures
                    .record(EntityKind::Wiki, &repository.name, "wiki", e),
            }
        }

        info!(
            labels = report.labels_created,
            issues = report.issues_created,
            comments = report.comments_created,
            "Repository done"
        );
        report
    }

    /// Resolves the destination repository for this scope.
    ///
    /// Only the `repos` scope creates missing repositories and starts imports.
    async fn destination_repository(
        &self,
        repository: &GitRepository,
        report: &mut RepositoryReport,
    ) -> Option<Arc<CachedRepository>> {
        if !self.scope.creates_repositories() {
            let cached = self.cache.get(&repository.name);
            if cached.is_none() {
                info!("Repository missing at destination, skipping");
            }
            return cached;
        }

        match self.reconciler.ensure_repository(repository).await {
            RepositoryStatus::Existing(cached) => Some(cached),
            RepositoryStatus::Created(cached) => {
                report.created = true;
                if self.reconciler.start_import(repository).await {
                    report.import_started = true;
                    let handle = self.tracker.spawn(repository.name.clone());
                    // The receiver is only dropped once every unit has finished.
                    let _ = self.imports.send((repository.name.clone(), handle));
                }
                Some(cached)
            }
            RepositoryStatus::Failed => None,
        }
    }
}
