//! CLI for forge-mover.
//!
//! Moves repositories, issues, comments, labels and wikis from GitLab into a
//! GitHub organization, creating only what is missing.

use clap::{Parser, Subcommand};
use forge_mover::{RunScope, RunSummary, Runner, RunnerConfig, RunnerError, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code after a forced quit on a second Ctrl+C.
const INTERRUPTED: i32 = 130;

/// forge-mover - Migrate GitLab repositories and their metadata to GitHub.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// GitHub personal access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// GitLab personal access token.
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true, global = true)]
    gitlab_token: Option<String>,

    /// GitLab user the destination imports authenticate as.
    #[arg(long, env = "GITLAB_USER", global = true)]
    gitlab_user: Option<String>,

    /// Destination GitHub organization.
    #[arg(long, env = "GHORG", global = true)]
    org: Option<String>,

    /// GitLab base URL.
    #[arg(short = 'u', long, env = "GITLAB_URL", global = true)]
    url: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,

    /// Reconcile against an in-memory destination instead of GitHub.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to a TOML settings file.
    #[arg(long, env = "FORGE_MOVER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Repositories processed at once (overrides the settings file).
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// SSH private key used to transfer wikis.
    #[arg(long, env = "FORGE_MOVER_SSH_KEY", global = true)]
    ssh_key: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Migrate repositories with their history, labels, issues, comments and wikis.
    Repos,
    /// Migrate labels, issues and comments of repositories already on GitHub.
    Issues,
    /// Transfer wikis of repositories already on GitHub.
    Wikis,
}

impl Command {
    fn scope(self) -> RunScope {
        match self {
            Self::Repos => RunScope::Repos,
            Self::Issues => RunScope::Issues,
            Self::Wikis => RunScope::Wikis,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        debug!("A rustls crypto provider was already installed");
    }

    let scope = args.command.scope();
    match run(args).await {
        Ok(summary) => {
            print_summary(scope, &summary);
            ExitCode::from(exit_code(&summary))
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with `--debug`.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// Main execution logic.
async fn run(args: Args) -> Result<RunSummary, RunnerError> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let runner = Runner::new(runner_config(&args, settings))?;

    let shutdown = tokio::spawn(handle_shutdown(runner.cancellation_token()));
    let result = runner.run().await;
    shutdown.abort();
    result
}

fn runner_config(args: &Args, settings: Settings) -> RunnerConfig {
    let config = RunnerConfig::new(
        args.github_token.clone().unwrap_or_default(),
        args.gitlab_token.clone().unwrap_or_default(),
        args.org.clone().unwrap_or_default(),
        args.command.scope(),
    )
    .with_gitlab_user(args.gitlab_user.clone().unwrap_or_default())
    .with_dry_run(args.dry_run)
    .with_concurrency(args.concurrency)
    .with_settings(settings)
    .with_ssh_key_path(args.ssh_key.clone());

    match &args.url {
        Some(url) => config.with_gitlab_url(url.clone()),
        None => config,
    }
}

/// Stops dispatch on the first Ctrl+C and quits on the second.
async fn handle_shutdown(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Could not listen for Ctrl+C");
        return;
    }
    warn!("Received Ctrl+C, finishing in-flight repositories (press again to quit)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Received second Ctrl+C, exiting");
        std::process::exit(INTERRUPTED);
    }
}

fn exit_code(summary: &RunSummary) -> u8 {
    if summary.has_failures() {
        1
    } else {
        0
    }
}

/// Prints the final run summary.
fn print_summary(scope: RunScope, summary: &RunSummary) {
    println!("\nSummary:");
    println!(
        "  Mode: {}",
        if summary.dry_run { "Dry Run" } else { "Live" }
    );
    println!("  Scope: {scope}");
    println!(
        "  Repositories discovered: {}",
        summary.repositories_discovered
    );
    println!("  Repositories skipped: {}", summary.repositories_skipped);
    println!("  Repositories created: {}", summary.repositories_created);
    println!(
        "  Imports: {} started, {} completed, {} still running, {} no longer tracked",
        summary.imports_started,
        summary.imports_completed,
        summary.imports_incomplete,
        summary.imports_cancelled
    );
    println!("  Labels created: {}", summary.labels_created);
    println!("  Issues created: {}", summary.issues_created);
    println!("  Comments created: {}", summary.comments_created);
    println!("  Wikis transferred: {}", summary.wikis_transferred);
    println!("  Failures: {}", summary.failures.len());
    for failure in &summary.failures {
        println!("    - {failure}");
    }
    if summary.cancelled {
        println!("  Cancelled before all repositories were dispatched");
    }
}
