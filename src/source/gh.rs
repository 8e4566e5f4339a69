use crate::model::{
    Error, FetchFilter, FetchRecord, PullRequestState, RepositoryRef, Result, WorkerPoolConfig,
    DATE_FORMAT,
};
use crate::source::{parse_timestamp, FetchError, PullRequestSource};
use serde::Deserialize;
use tokio::process::Command;

const LOG_TARGET: &str = "gh";
const PROGRAM: &str = "gh";
const JSON_FIELDS: &str = "number,title,state,mergedAt,createdAt,author";
const DEFAULT_LIMIT: usize = 1000;

/// Fetches merged pull requests through the GitHub CLI, which owns
/// authentication and pagination.
#[derive(Debug, Clone)]
pub struct GhCliSource {
    program: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    state: PullRequestState,
    created_at: String,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    author: Option<GhAuthor>,
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    login: String,
}

impl GhCliSource {
    pub fn new() -> Self {
        Self {
            program: PROGRAM.to_string(),
        }
    }

    /// Fails unless `gh` is installed and logged in.
    pub async fn check(&self) -> Result<()> {
        let version = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                Error::SourceUnavailable(format!(
                    "GitHub CLI (gh) is not installed or not in PATH: {e}"
                ))
            })?;
        if !version.status.success() {
            return Err(Error::SourceUnavailable(format!(
                "`gh --version` exited with {}",
                version.status
            )));
        }

        let auth = Command::new(&self.program)
            .args(["auth", "status"])
            .output()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("unable to run `gh auth status`: {e}")))?;
        // Depending on the version, gh reports the login on stdout or stderr.
        let report = format!(
            "{}{}",
            String::from_utf8_lossy(&auth.stdout),
            String::from_utf8_lossy(&auth.stderr)
        );
        if !auth.status.success() || !report.contains("Logged in") {
            return Err(Error::SourceUnavailable("GitHub CLI is not authenticated".to_string()));
        }
        log::debug!(target: LOG_TARGET, "GitHub CLI is available and authenticated");
        Ok(())
    }
}

impl Default for GhCliSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PullRequestSource for GhCliSource {
    async fn fetch(
        &self,
        repository: &RepositoryRef,
        filter: &FetchFilter,
        config: &WorkerPoolConfig,
    ) -> std::result::Result<Vec<FetchRecord>, FetchError> {
        let args = list_args(repository, filter, config);
        let command_line = format!("{} {}", self.program, args.join(" "));
        log::debug!(target: LOG_TARGET, "running {command_line}");

        let mut command = Command::new(&self.program);
        command.args(&args).kill_on_drop(true);
        let output = command.output().await.map_err(|e| FetchError::Spawn {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(FetchError::Command {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_pull_requests(&output.stdout)
    }
}

fn list_args(
    repository: &RepositoryRef,
    filter: &FetchFilter,
    config: &WorkerPoolConfig,
) -> Vec<String> {
    let limit = config.effective_limit(filter).unwrap_or(DEFAULT_LIMIT);
    let mut args = [
        "pr",
        "list",
        "--repo",
        repository.key().as_str(),
        "--state",
        "merged",
        "--json",
        JSON_FIELDS,
        "--limit",
        limit.to_string().as_str(),
    ]
    .map(String::from)
    .to_vec();
    if let Some(query) = search_query(filter) {
        args.push("--search".to_string());
        args.push(query);
    }
    args
}

fn search_query(filter: &FetchFilter) -> Option<String> {
    let terms = [
        filter.start_date.map(|start| format!("merged:>={}", start.format(DATE_FORMAT))),
        filter.end_date.map(|end| format!("merged:<={}", end.format(DATE_FORMAT))),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();
    (!terms.is_empty()).then(|| terms.join(" "))
}

fn parse_pull_requests(json: &[u8]) -> std::result::Result<Vec<FetchRecord>, FetchError> {
    let pull_requests: Vec<GhPullRequest> =
        serde_json::from_slice(json).map_err(|e| FetchError::Parse(e.to_string()))?;
    pull_requests
        .into_iter()
        .map(|pr| {
            let created_at = parse_timestamp(&pr.created_at)?;
            let merged_at = pr.merged_at.as_deref().map(parse_timestamp).transpose()?;
            Ok(FetchRecord::new(
                pr.number,
                pr.title,
                pr.state,
                created_at,
                merged_at,
                pr.author.map(|author| author.login),
            ))
        })
        .collect()
}
