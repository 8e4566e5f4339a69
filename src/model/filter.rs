use crate::model::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shared, read-only filter handed to every fetch of a run.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FetchFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

// Create
impl FetchFilter {
    /// A `limit` of zero means no limit.
    pub fn new(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Self> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(Error::Config(format!(
                    "start date {} is after end date {}",
                    start.format(DATE_FORMAT),
                    end.format(DATE_FORMAT)
                )));
            }
        }
        Ok(Self {
            start_date,
            end_date,
            limit: (limit > 0).then_some(limit),
        })
    }
}

impl FetchFilter {
    /// Whether a merge timestamp falls inside the inclusive date bounds.
    pub fn contains(&self, merged_at: DateTime<Utc>) -> bool {
        let date = merged_at.date_naive();
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WorkerPoolConfig {
    pub max_workers: usize,
    /// 0 = unbounded
    pub max_records_per_repo: usize,
    pub page_size: usize,
    pub fetch_timeout: Option<Duration>,
}

impl WorkerPoolConfig {
    pub fn new(max_workers: usize, max_records_per_repo: usize, page_size: usize) -> Self {
        Self {
            max_workers,
            max_records_per_repo,
            page_size,
            fetch_timeout: None,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Record cap for one repository: the filter's limit wins over the pool cap.
    pub fn effective_limit(&self, filter: &FetchFilter) -> Option<usize> {
        filter
            .limit
            .or((self.max_records_per_repo > 0).then_some(self.max_records_per_repo))
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(10, 0, 200)
    }
}
