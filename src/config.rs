use crate::model::{Error, FetchFilter, Result, WorkerPoolConfig, DATE_FORMAT};
use crate::{Args, SourceKind};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

/// Where pull requests are read from, with the credentials each needs.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SourceConfig {
    GhCli,
    Gitea { url: String, token: String },
}

/// Validated command line, built once in `main` and passed down by reference.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repos_path: PathBuf,
    pub output: PathBuf,
    pub filter: FetchFilter,
    pub pool: WorkerPoolConfig,
    pub batch_size: usize,
    pub batch_number: usize,
    pub deadline: Option<Duration>,
    pub source: SourceConfig,
}

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let start = args.start.as_deref().map(|s| parse_date("start", s)).transpose()?;
        let end = args.end.as_deref().map(|s| parse_date("end", s)).transpose()?;
        let filter = FetchFilter::new(start, end, args.max_prs)?;

        if args.page_size < 1 {
            return Err(Error::Config("page size must be at least 1".to_string()));
        }
        if args.batch < 1 {
            return Err(Error::Config("batch number must be at least 1".to_string()));
        }

        let pool = WorkerPoolConfig::new(args.workers, args.max_prs, args.page_size)
            .with_fetch_timeout(seconds(args.fetch_timeout));

        let source = match args.source {
            SourceKind::Gh => SourceConfig::GhCli,
            SourceKind::Gitea => {
                let url = args
                    .gitea_url
                    .as_deref()
                    .map(|url| url.trim_end_matches('/'))
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        Error::Config("--gitea-url is required with --source gitea".to_string())
                    })?;
                let token = args
                    .gitea_token
                    .clone()
                    .filter(|token| !token.is_empty())
                    .ok_or_else(|| {
                        Error::Config(
                            "--gitea-token or GITEA_TOKEN is required with --source gitea"
                                .to_string(),
                        )
                    })?;
                SourceConfig::Gitea {
                    url: url.to_string(),
                    token,
                }
            }
        };

        Ok(Self {
            repos_path: args.repos_path.clone(),
            output: args.output.clone(),
            filter,
            pool,
            batch_size: args.batch_size,
            batch_number: args.batch,
            deadline: seconds(args.deadline),
            source,
        })
    }

    /// The spreadsheet lands next to the markdown report.
    pub fn spreadsheet_path(&self) -> PathBuf {
        self.output.with_extension("xlsx")
    }
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        Error::Config(format!("invalid {name} date `{value}`, expected YYYY-MM-DD: {e}"))
    })
}

fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|s| *s > 0).map(Duration::from_secs)
}
