pub mod gh;
pub mod gitea;

pub use gh::GhCliSource;
pub use gitea::GiteaSource;

use crate::model::{FetchFilter, FetchRecord, RepositoryRef, WorkerPoolConfig};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure of one repository's fetch. Recorded, never propagated.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FetchError {
    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to parse pull request data: {0}")]
    Parse(String),

    #[error("api request failed: {0}")]
    Api(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch cancelled: run deadline reached")]
    Cancelled,

    #[error("fetch task failed: {0}")]
    Panicked(String),
}

/// Where pull requests come from. Called concurrently from every worker of
/// the pool, so implementations keep no per-call mutable state.
pub trait PullRequestSource: Send + Sync + 'static {
    fn fetch(
        &self,
        repository: &RepositoryRef,
        filter: &FetchFilter,
        config: &WorkerPoolConfig,
    ) -> impl Future<Output = Result<Vec<FetchRecord>, FetchError>> + Send;
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::parse_from_rfc3339(value)
        .map(|datetime| datetime.with_timezone(&Utc))
        .map_err(|e| FetchError::Parse(format!("not a valid date time `{value}`: {e}")))
}
