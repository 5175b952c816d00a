//! zpick - z-stream pick planner CLI
//!
//! ## Commands
//!
//! - `run`: score, filter and budget candidate pull requests for a release
//!   and write the Decision List
//! - `list`: print a previously written Decision List as a table

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};

use zpick_core::{
    emit_merge_window_closed, read_decision_list, render_decision_list, render_decision_table,
    render_metrics_table, run_release, write_decision_list, AllocationOptions, AllocationOutcome,
    AllocationPipeline, Decision, ScoringPoolConfig, ScoringProgress, METRICS,
};
use zpick_tracker::{fetch_config, BugzillaClient, BugzillaConfig, GithubConfig, GithubLister};

#[derive(Parser)]
#[command(name = "zpick")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan which pull requests to cherry-pick into a z-stream release", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score candidates for a release and write the Decision List
    Run {
        /// Release to plan, e.g. "4.7" (default: `release` from the config)
        #[arg(short, long)]
        release: Option<String>,

        /// Configuration file path or http(s) URL
        #[arg(short, long, env = "ZPICK_CONFIG")]
        config: String,

        /// Write the Decision List here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Share of the total QE capacity to use (0-100)
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
        use_capacity_percent: u8,

        /// Concurrent defect lookups
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// GitHub token used for the search API
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// Bugzilla API key
        #[arg(long, env = "BUGZILLA_APIKEY", hide_env_values = true)]
        bugzilla_apikey: Option<String>,
    },

    /// Print a Decision List as a table
    List {
        /// Decision List file written by `run`
        #[arg(short, long)]
        file: PathBuf,

        /// Only show entries with this decision
        #[arg(long, value_enum)]
        decision: Option<DecisionFilter>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecisionFilter {
    Pick,
    Skip,
}

impl From<DecisionFilter> for Decision {
    fn from(filter: DecisionFilter) -> Self {
        match filter {
            DecisionFilter::Pick => Decision::Pick,
            DecisionFilter::Skip => Decision::Skip,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    zpick_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            release,
            config,
            output,
            use_capacity_percent,
            workers,
            github_token,
            bugzilla_apikey,
        } => {
            cmd_run(RunArgs {
                release,
                config,
                output,
                use_capacity_percent,
                workers,
                github_token,
                bugzilla_apikey,
            })
            .await
        }
        Commands::List { file, decision } => cmd_list(&file, decision.map(Decision::from)),
    }
}

struct RunArgs {
    release: Option<String>,
    config: String,
    output: Option<PathBuf>,
    use_capacity_percent: u8,
    workers: usize,
    github_token: Option<String>,
    bugzilla_apikey: Option<String>,
}

/// Cancel `token` on Ctrl-C so in-flight defect lookups stop.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling the run");
            token.cancel();
        }
    });
}

fn log_progress(progress: ScoringProgress) {
    debug!(
        completed = progress.completed,
        total = progress.total,
        "candidate classified"
    );
    if progress.completed == progress.total {
        info!("classified {} candidate pull requests", progress.total);
    }
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = fetch_config(&args.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let release = args
        .release
        .or_else(|| config.release.clone())
        .context("No release given; pass --release or set `release` in the configuration")?;

    let today = chrono::Local::now().date_naive();
    if !config.merge_window.is_open(today) {
        emit_merge_window_closed(
            config.merge_window.from.as_deref(),
            config.merge_window.to.as_deref(),
        );
    }

    let mut github = GithubConfig::default();
    if let Some(token) = &args.github_token {
        github = github.with_token(token);
    } else {
        warn!("no GitHub token configured; search requests are heavily rate-limited");
    }
    let lister = GithubLister::new(github).context("Failed to create GitHub client")?;

    let mut bugzilla = BugzillaConfig::default();
    if let Some(key) = &args.bugzilla_apikey {
        bugzilla = bugzilla.with_api_key(key);
    }
    let resolver =
        Arc::new(BugzillaClient::new(bugzilla).context("Failed to create Bugzilla client")?);

    let pipeline = AllocationPipeline::from_config(
        &config,
        resolver,
        ScoringPoolConfig {
            workers: args.workers,
        },
        AllocationOptions {
            use_capacity_percent: args.use_capacity_percent,
        },
    )
    .with_progress(log_progress);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let outcome = run_release(&lister, &release, &pipeline, &cancel)
        .await
        .with_context(|| format!("Pick run for release {} failed", release))?;
    METRICS.flush();

    info!(
        "{} of {} pull requests picked ({} refused by rules)",
        outcome.total_picks,
        outcome.decisions.len(),
        outcome.rejected
    );

    if let Some(path) = &args.output {
        write_decision_list(path, &outcome.decisions)
            .with_context(|| format!("Failed to write Decision List to {:?}", path))?;
        info!("Result saved to {:?}", path);
    }
    write_run_report(
        &outcome,
        args.output.is_none(),
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )
}

/// Print the per-component table and, when `list_to_stdout`, the Decision
/// List. The table goes to `err` in that case so `out` parses as YAML.
fn write_run_report(
    outcome: &AllocationOutcome,
    list_to_stdout: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()> {
    let table = render_metrics_table(&outcome.metrics);
    if list_to_stdout {
        write!(err, "\n{}\n", table)?;
        let rendered = render_decision_list(&outcome.decisions)
            .context("Failed to render Decision List")?;
        writeln!(out, "{}", rendered)?;
    } else {
        write!(out, "\n{}\n", table)?;
    }
    Ok(())
}

fn cmd_list(file: &Path, only: Option<Decision>) -> Result<()> {
    let list = read_decision_list(file)
        .with_context(|| format!("Failed to read Decision List {:?}", file))?;

    if list.is_empty() {
        println!("No pull requests in {:?}", file);
        return Ok(());
    }

    print!("{}", render_decision_table(&list, only));
    println!(
        "\n{} entries, {} picked",
        list.len(),
        list.picks().count()
    );
    Ok(())
}
