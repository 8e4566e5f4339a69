mod analyze;
mod config;
mod model;
mod pool;
mod report;
mod source;
mod utils;

use crate::analyze::{aggregate, Aggregated};
use crate::config::{RunConfig, SourceConfig};
use crate::model::{Error, RepositoriesConfig, RepositoryRef, Result, DATE_FORMAT};
use crate::pool::{batch_count, partition, WorkerPool};
use crate::report::markdown::MarkdownReport;
use crate::report::{excel, Host, ReportContext};
use crate::source::{GhCliSource, GiteaSource, PullRequestSource};
use crate::utils::MultiProgressNew;
use clap::{Parser, ValueEnum};
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::Instant;

const LOG_TARGET: &str = "main";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Collects merged pull requests across many repositories into a report")]
struct Args {
    /// Repositories file (YAML or JSON)
    #[arg(short = 'r', long = "repos", default_value = "repositories.yaml")]
    repos_path: PathBuf,
    /// Earliest merge date, YYYY-MM-DD
    #[arg(short, long)]
    start: Option<String>,
    /// Latest merge date, YYYY-MM-DD
    #[arg(short, long)]
    end: Option<String>,
    /// Markdown report path, the spreadsheet is written next to it
    #[arg(short, long, default_value = "pr-analysis.md")]
    output: PathBuf,
    #[arg(short, long, default_value_t = 10)]
    workers: usize,
    /// Maximum pull requests per repository (0 = no limit)
    #[arg(short = 'm', long = "max-prs", default_value_t = 0)]
    max_prs: usize,
    #[arg(short = 'p', long = "page-size", default_value_t = 200)]
    page_size: usize,
    /// Repositories per batch (0 = all at once)
    #[arg(short = 'b', long = "batch-size", default_value_t = 0)]
    batch_size: usize,
    /// Batch to process, starting at 1
    #[arg(short = 'n', long = "batch", default_value_t = 1)]
    batch: usize,
    #[arg(long, value_enum, default_value_t = SourceKind::Gh)]
    source: SourceKind,
    #[arg(long = "gitea-url")]
    gitea_url: Option<String>,
    #[arg(long = "gitea-token", env = "GITEA_TOKEN", hide_env_values = true)]
    gitea_token: Option<String>,
    /// Seconds before a single repository fetch is abandoned
    #[arg(long = "fetch-timeout", value_name = "SECONDS")]
    fetch_timeout: Option<u64>,
    /// Seconds before the run abandons every unfinished fetch
    #[arg(long, value_name = "SECONDS")]
    deadline: Option<u64>,
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
enum SourceKind {
    /// GitHub through the `gh` CLI
    Gh,
    Gitea,
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

async fn run(args: &Args) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let repositories = RepositoriesConfig::from_config(&config.repos_path)?;
    let all = repositories.all_repositories();

    let batch = partition(&all, config.batch_size, config.batch_number);
    if batch.is_empty() {
        return Err(Error::Config(format!(
            "batch {} is empty. Total repositories: {}, batch size: {}",
            config.batch_number,
            all.len(),
            config.batch_size
        )));
    }

    if config.batch_size > 0 {
        println!(
            "🚀 Processing batch {}/{} ({} repositories) using {} workers",
            config.batch_number,
            batch_count(all.len(), config.batch_size),
            batch.len(),
            config.pool.max_workers
        );
    } else {
        println!(
            "🚀 Fetching pull requests from {} repositories using {} workers",
            batch.len(),
            config.pool.max_workers
        );
    }

    match &config.source {
        SourceConfig::GhCli => {
            let source = GhCliSource::new();
            source.check().await?;
            fetch_and_report(source, Host::GitHub, &config, &repositories, batch).await
        }
        SourceConfig::Gitea { url, token } => {
            let source = GiteaSource::new(url, token);
            let host = Host::Gitea {
                url: source.url().to_string(),
            };
            fetch_and_report(source, host, &config, &repositories, batch).await
        }
    }
}

async fn fetch_and_report<S: PullRequestSource>(
    source: S,
    host: Host,
    config: &RunConfig,
    repositories: &RepositoriesConfig,
    batch: &[RepositoryRef],
) -> Result<()> {
    let pool = WorkerPool::new(source, config.pool.clone())?;
    log_filter(config);

    let multi_progress = MultiProgress::default();
    let mut progress = multi_progress.add_repository_bar(batch.len());

    let deadline = config.deadline.map(|d| Instant::now() + d);
    let results = pool
        .run_with(batch, &config.filter, deadline, |result| progress.on_result(result))
        .await;
    progress.finish();

    let aggregated = aggregate(results, &repositories.vertical_index());
    print_summary(&aggregated);

    let context = ReportContext::new(host);
    aggregated.report_create(&config.output, &context)?;
    println!("📝 Markdown report written to {}", config.output.display());

    let spreadsheet = config.spreadsheet_path();
    excel::generate(&aggregated, &context, &spreadsheet)?;
    println!("📊 Spreadsheet written to {}", spreadsheet.display());
    Ok(())
}

fn log_filter(config: &RunConfig) {
    if let Some(start) = config.filter.start_date {
        log::info!(target: LOG_TARGET, "start merge date filter: {}", start.format(DATE_FORMAT));
    }
    if let Some(end) = config.filter.end_date {
        log::info!(target: LOG_TARGET, "end merge date filter: {}", end.format(DATE_FORMAT));
    }
    if config.pool.max_records_per_repo > 0 {
        log::info!(
            target: LOG_TARGET,
            "max pull requests per repository: {}",
            config.pool.max_records_per_repo
        );
    }
    log::info!(target: LOG_TARGET, "page size: {}", config.pool.page_size);
}

fn print_summary(aggregated: &Aggregated) {
    println!(
        "📊 Results: {} of {} repositories processed successfully, {} failed",
        aggregated.success_count,
        aggregated.repositories_processed(),
        aggregated.failure_count
    );
    println!("📈 Total pull requests collected: {}", aggregated.items.len());
}
