mod batch;
mod worker_pool;

pub use batch::{batch_count, partition};
pub use worker_pool::{RepositoryResult, WorkerPool};
