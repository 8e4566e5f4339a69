mod filter;
mod pull_request;
mod repository;
mod result;

pub use filter::{FetchFilter, WorkerPoolConfig, DATE_FORMAT};
pub use pull_request::{FetchRecord, PullRequestState};
pub use repository::{RepositoriesConfig, RepositoryRef, VerticalIndex};
pub use result::{Error, Result};
