use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use forge_mover::{
    AuthId, DryRunWikiTransfer, EntityKind, FakeCall, FakeFailure, FakeProvider, GitIssue,
    GitIssueComment, GitLabel, GitProvider, GitRepository, ImportStatus, IssueState,
    ProviderError, RunScope, RunSummary, Runner, RunnerConfig, RunnerError, WikiError,
    WikiOutcome, WikiTransfer,
};
use tokio_util::sync::CancellationToken;

const SOURCE_TOKEN: &str = "glpat-source";

fn repo(name: &str) -> GitRepository {
    GitRepository {
        name: name.to_string(),
        description: format!("{name} service"),
        clone_url: format!("https://gitlab.com/alice/{name}.git"),
        ssh_url: format!("git@gitlab.com:alice/{name}.git"),
        owner: "alice".to_string(),
        ..Default::default()
    }
}

fn issue(repository: &str, number: u64, title: &str) -> GitIssue {
    GitIssue {
        repository: repository.to_string(),
        number,
        title: title.to_string(),
        body: format!("Details for {title}"),
        labels: vec!["bug".to_string()],
        ..Default::default()
    }
}

fn comment(repository: &str, issue_number: u64, minute: u32) -> GitIssueComment {
    let at = Utc.with_ymd_and_hms(2024, 3, 10, 9, minute, 0).unwrap();
    GitIssueComment {
        repository: repository.to_string(),
        issue_number,
        body: format!("Reply {minute}"),
        created_at: at,
        updated_at: at,
        ..Default::default()
    }
}

fn label(repository: &str, name: &str) -> GitLabel {
    GitLabel {
        repository: repository.to_string(),
        name: name.to_string(),
        color: "#d73a4a".to_string(),
        description: format!("{name} label"),
    }
}

fn source() -> Arc<FakeProvider> {
    Arc::new(
        FakeProvider::with_auth(AuthId::new("https://gitlab.com", SOURCE_TOKEN, "alice"))
            .named("source"),
    )
}

fn destination() -> Arc<FakeProvider> {
    Arc::new(
        FakeProvider::with_auth(AuthId::new("https://github.com", "ghp-destination", "acme"))
            .named("destination"),
    )
}

/// A source repository with two labels, two issues (one closed) and three comments.
fn seeded_source() -> Arc<FakeProvider> {
    let source = source();
    source.seed_repository(repo("app"));
    source.seed_label(label("app", "bug")).unwrap();
    source.seed_label(label("app", "feature")).unwrap();
    source.seed_issue(issue("app", 1, "Crash on start")).unwrap();
    source
        .seed_issue(GitIssue {
            state: IssueState::Closed,
            ..issue("app", 2, "Slow login")
        })
        .unwrap();
    source.seed_comment(comment("app", 1, 0)).unwrap();
    source.seed_comment(comment("app", 1, 5)).unwrap();
    source.seed_comment(comment("app", 2, 1)).unwrap();
    source
}

fn runner(
    source: &Arc<FakeProvider>,
    destination: &Arc<FakeProvider>,
    scope: RunScope,
) -> Runner {
    runner_with_wiki(source, destination, scope, Arc::new(DryRunWikiTransfer))
}

fn runner_with_wiki(
    source: &Arc<FakeProvider>,
    destination: &Arc<FakeProvider>,
    scope: RunScope,
    wiki: Arc<dyn WikiTransfer>,
) -> Runner {
    let config = RunnerConfig::new("ghp-destination", SOURCE_TOKEN, "acme", scope);
    Runner::with_providers(config, source.clone(), destination.clone(), wiki).unwrap()
}

fn count(calls: &[FakeCall], predicate: impl Fn(&FakeCall) -> bool) -> usize {
    calls.iter().filter(|call| predicate(call)).count()
}

/// Records which repositories had their wiki transferred.
#[derive(Default)]
struct RecordingWiki {
    transferred: Mutex<Vec<String>>,
}

#[async_trait]
impl WikiTransfer for RecordingWiki {
    async fn transfer(
        &self,
        repository: &GitRepository,
        _source: &AuthId,
        _destination: &AuthId,
    ) -> Result<WikiOutcome, WikiError> {
        self.transferred
            .lock()
            .unwrap()
            .push(repository.name.clone());
        Ok(WikiOutcome::Transferred)
    }
}

/// Destination that delays its writes and counts overlapping repository creations.
///
/// With `cancel_on_label` set, the first label creation cancels that token.
struct SlowDestination {
    inner: Arc<FakeProvider>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    cancel_on_label: Option<CancellationToken>,
}

impl SlowDestination {
    fn new(inner: Arc<FakeProvider>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            cancel_on_label: None,
        }
    }

    fn cancelling(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_label = Some(cancel);
        self
    }
}

#[async_trait]
impl GitProvider for SlowDestination {
    fn name(&self) -> &str {
        "slow"
    }

    fn auth(&self) -> &AuthId {
        self.inner.auth()
    }

    async fn get_repositories(&self) -> Result<Vec<GitRepository>, ProviderError> {
        self.inner.get_repositories().await
    }

    async fn get_issues(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssue>, ProviderError> {
        self.inner.get_issues(repository_id, repository_name).await
    }

    async fn get_comments(
        &self,
        repository_id: u64,
        issue_number: u64,
        repository_name: &str,
    ) -> Result<Vec<GitIssueComment>, ProviderError> {
        self.inner
            .get_comments(repository_id, issue_number, repository_name)
            .await
    }

    async fn get_labels(
        &self,
        repository_id: u64,
        repository_name: &str,
    ) -> Result<Vec<GitLabel>, ProviderError> {
        self.inner.get_labels(repository_id, repository_name).await
    }

    async fn create_repository(
        &self,
        repository: &GitRepository,
    ) -> Result<GitRepository, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.create_repository(repository).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn create_issue(&self, issue: &GitIssue) -> Result<GitIssue, ProviderError> {
        self.inner.create_issue(issue).await
    }

    async fn create_issue_comment(&self, comment: &GitIssueComment) -> Result<(), ProviderError> {
        self.inner.create_issue_comment(comment).await
    }

    async fn create_label(&self, label: &GitLabel) -> Result<GitLabel, ProviderError> {
        if let Some(cancel) = &self.cancel_on_label {
            cancel.cancel();
        }
        tokio::time::sleep(self.delay).await;
        self.inner.create_label(label).await
    }

    async fn migrate_repo(
        &self,
        repository: &GitRepository,
        auth_token: &str,
    ) -> Result<ImportStatus, ProviderError> {
        self.inner.migrate_repo(repository, auth_token).await
    }

    async fn get_import_progress(
        &self,
        repository_name: &str,
    ) -> Result<ImportStatus, ProviderError> {
        self.inner.get_import_progress(repository_name).await
    }
}

#[tokio::test]
async fn full_run_migrates_everything_once() {
    let source = seeded_source();
    let destination = destination();

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert!(summary.all_success(), "{:?}", summary.failures);
    assert_eq!(summary.repositories_created, 1);
    assert_eq!(summary.imports_started, 1);
    assert_eq!(summary.imports_completed, 1);
    assert_eq!(summary.labels_created, 2);
    assert_eq!(summary.issues_created, 2);
    assert_eq!(summary.comments_created, 3);

    let issues = destination.issues("app");
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[1].title, "Slow login");
    assert_eq!(issues[1].state, IssueState::Closed);
    assert_eq!(destination.comments("app", 1).len(), 2);
}

#[tokio::test]
async fn second_run_makes_no_calls() {
    let source = seeded_source();
    let destination = destination();
    runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();
    destination.clear_calls();

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert!(summary.all_success(), "{:?}", summary.failures);
    assert!(destination.calls().is_empty(), "{:?}", destination.calls());
    assert_eq!(summary.issues_created + summary.comments_created, 0);
}

#[tokio::test]
async fn forks_and_empty_repositories_are_left_alone() {
    let source = source();
    source.seed_repository(repo("app"));
    source.seed_repository(GitRepository {
        fork: true,
        ..repo("forked")
    });
    source.seed_repository(GitRepository {
        empty: true,
        ..repo("blank")
    });
    let destination = destination();

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.repositories_discovered, 3);
    assert_eq!(summary.repositories_skipped, 2);
    let calls = destination.calls();
    assert!(calls.iter().all(|call| match call {
        FakeCall::CreateRepository(name) | FakeCall::GetImportProgress(name) => name == "app",
        FakeCall::MigrateRepo { repository, .. } => repository == "app",
        _ => true,
    }));
    assert_eq!(destination.repository_names(), vec!["app".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn missing_repository_is_created_then_imported_with_source_token() {
    let source = source();
    source.seed_repository(repo("app"));
    let destination = destination();
    destination.script_import(
        "app",
        [ImportStatus::new("importing"), ImportStatus::new("importing")],
    );

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    let calls = destination.calls();
    assert_eq!(calls[0], FakeCall::CreateRepository("app".to_string()));
    assert_eq!(
        calls[1],
        FakeCall::MigrateRepo {
            repository: "app".to_string(),
            auth_token: SOURCE_TOKEN.to_string(),
        }
    );
    assert_eq!(
        count(&calls, |c| matches!(c, FakeCall::MigrateRepo { .. })),
        1
    );
    assert_eq!(
        count(&calls, |c| matches!(c, FakeCall::GetImportProgress(_))),
        3
    );
    assert_eq!(summary.imports_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn unfinished_import_is_not_a_failure() {
    let source = source();
    source.seed_repository(repo("app"));
    let destination = destination();
    destination.script_import("app", (0..10).map(|_| ImportStatus::new("importing")));

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert_eq!(
        count(&destination.calls(), |c| matches!(
            c,
            FakeCall::GetImportProgress(_)
        )),
        5
    );
    assert_eq!(summary.imports_incomplete, 1);
    assert!(summary.all_success());
}

#[tokio::test]
async fn one_failing_label_still_creates_the_others() {
    let source = source();
    source.seed_repository(repo("app"));
    for name in ["bug", "feature", "docs", "ci", "security"] {
        source.seed_label(label("app", name)).unwrap();
    }
    let destination = destination();
    destination.inject_failure(FakeFailure::CreateLabel {
        repository: "app".to_string(),
        name: "ci".to_string(),
    });

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.labels_created, 4);
    assert_eq!(destination.labels("app").len(), 4);
    assert!(summary.has_failures());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, EntityKind::Label);
    assert_eq!(summary.failures[0].entity, "ci");
}

#[tokio::test]
async fn issue_with_same_title_only_gets_missing_comments() {
    let source = source();
    source.seed_repository(repo("app"));
    source.seed_issue(issue("app", 1, "Crash on start")).unwrap();
    source.seed_comment(comment("app", 1, 0)).unwrap();
    source.seed_comment(comment("app", 1, 5)).unwrap();

    let destination = destination();
    destination.seed_repository(repo("app"));
    destination.seed_label(label("app", "bug")).unwrap();
    destination
        .seed_issue(GitIssue {
            number: 4,
            body: "Created by hand".to_string(),
            ..issue("app", 1, "Crash on start")
        })
        .unwrap();
    destination
        .seed_comment(GitIssueComment {
            issue_number: 4,
            ..comment("app", 1, 0)
        })
        .unwrap();

    let summary = runner(&source, &destination, RunScope::Issues)
        .run()
        .await
        .unwrap();

    assert!(summary.all_success(), "{:?}", summary.failures);
    assert_eq!(
        destination.create_calls(),
        vec![FakeCall::CreateIssueComment {
            repository: "app".to_string(),
            issue_number: 4,
        }]
    );
}

#[tokio::test]
async fn dry_run_destination_ends_up_with_every_eligible_repository() {
    let source = source();
    for name in ["api", "app", "web"] {
        source.seed_repository(repo(name));
    }
    source.seed_repository(GitRepository {
        fork: true,
        ..repo("vendored")
    });
    let destination = destination();

    let summary = runner(&source, &destination, RunScope::Repos)
        .run()
        .await
        .unwrap();

    assert!(summary.all_success(), "{:?}", summary.failures);
    assert_eq!(
        destination.repository_names(),
        vec!["api".to_string(), "app".to_string(), "web".to_string()]
    );

    let orphan = GitIssueComment {
        issue_number: 99,
        ..comment("app", 99, 0)
    };
    let err = destination.create_issue_comment(&orphan).await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn issues_scope_skips_repositories_missing_at_destination() {
    let source = seeded_source();
    source.seed_repository(repo("lib"));
    let destination = destination();
    destination.seed_repository(repo("app"));

    let summary = runner(&source, &destination, RunScope::Issues)
        .run()
        .await
        .unwrap();

    let calls = destination.calls();
    assert_eq!(
        count(&calls, |c| matches!(
            c,
            FakeCall::CreateRepository(_) | FakeCall::MigrateRepo { .. }
        )),
        0
    );
    assert_eq!(summary.repositories_skipped, 1);
    assert_eq!(summary.issues_created, 2);
    assert_eq!(destination.repository_names(), vec!["app".to_string()]);
}

#[tokio::test]
async fn wikis_scope_only_transfers_existing_repositories() {
    let source = seeded_source();
    source.seed_repository(repo("lib"));
    let destination = destination();
    destination.seed_repository(repo("lib"));
    let wiki = Arc::new(RecordingWiki::default());

    let summary = runner_with_wiki(&source, &destination, RunScope::Wikis, wiki.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(*wiki.transferred.lock().unwrap(), vec!["lib".to_string()]);
    assert_eq!(summary.wikis_transferred, 1);
    assert!(destination.create_calls().is_empty());
}

#[tokio::test]
async fn cancelled_run_dispatches_nothing() {
    let source = seeded_source();
    let destination = destination();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary: RunSummary = runner(&source, &destination, RunScope::Repos)
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert!(destination.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_repositories_never_exceed_concurrency() {
    let source = source();
    for i in 0..20 {
        source.seed_repository(repo(&format!("repo-{i:02}")));
    }
    let fake = destination();
    let destination = Arc::new(SlowDestination::new(fake.clone(), Duration::from_millis(20)));
    let config = RunnerConfig::new("ghp-destination", SOURCE_TOKEN, "acme", RunScope::Repos)
        .with_concurrency(Some(3));

    let summary = Runner::with_providers(
        config,
        source.clone(),
        destination.clone(),
        Arc::new(DryRunWikiTransfer),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert!(summary.all_success(), "{:?}", summary.failures);
    assert_eq!(summary.repositories_created, 20);
    assert_eq!(fake.repository_names().len(), 20);
    let peak = destination.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in flight was {peak}");
    assert!(peak > 1, "repositories never overlapped");
}

#[tokio::test(start_paused = true)]
async fn cancellation_lets_the_running_repository_finish() {
    let source = seeded_source();
    source.seed_repository(repo("lib"));
    source.seed_repository(repo("web"));
    let fake = destination();
    fake.script_import("app", (0..10).map(|_| ImportStatus::new("importing")));
    let cancel = CancellationToken::new();
    let destination = Arc::new(
        SlowDestination::new(fake.clone(), Duration::from_millis(50)).cancelling(cancel.clone()),
    );
    let config = RunnerConfig::new("ghp-destination", SOURCE_TOKEN, "acme", RunScope::Repos)
        .with_concurrency(Some(1));

    let summary = Runner::with_providers(
        config,
        source.clone(),
        destination,
        Arc::new(DryRunWikiTransfer),
    )
    .unwrap()
    .with_cancellation(cancel)
    .run()
    .await
    .unwrap();

    assert!(summary.cancelled);
    assert!(summary.all_success(), "{:?}", summary.failures);
    assert_eq!(fake.repository_names(), vec!["app".to_string()]);
    assert_eq!(fake.labels("app").len(), 2);
    assert_eq!(fake.issues("app").len(), 2);
    assert_eq!(fake.comments("app", 1).len(), 2);
    assert_eq!(fake.comments("app", 2).len(), 1);
    assert_eq!(
        count(&fake.calls(), |c| matches!(c, FakeCall::CreateRepository(_))),
        1
    );
    assert_eq!(summary.imports_started, 1);
    assert_eq!(summary.imports_cancelled, 1);
    assert_eq!(summary.imports_incomplete, 0);
}

#[tokio::test]
async fn destination_cache_failure_aborts_the_run() {
    let source = seeded_source();
    let destination = destination();
    destination.seed_repository(repo("app"));
    destination.inject_failure(FakeFailure::ListLabels("app".to_string()));

    let result = runner(&source, &destination, RunScope::Repos).run().await;

    assert!(matches!(result, Err(RunnerError::Cache(_))));
    assert!(destination.calls().is_empty());
}

#[tokio::test]
async fn source_listing_failure_aborts_the_run() {
    let source = seeded_source();
    source.inject_failure(FakeFailure::ListRepositories);
    let destination = destination();

    let result = runner(&source, &destination, RunScope::Repos).run().await;

    assert!(matches!(result, Err(RunnerError::Source(_))));
}
