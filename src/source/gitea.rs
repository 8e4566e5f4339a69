use crate::model::{FetchFilter, FetchRecord, PullRequestState, RepositoryRef, WorkerPoolConfig};
use crate::source::{parse_timestamp, FetchError, PullRequestSource};
use gitea_sdk::model::issues::State;
use gitea_sdk::{Auth, Client};
use std::fmt;

const LOG_TARGET: &str = "gitea";

pub type GiteaPullRequest = gitea_sdk::model::pulls::PullRequest;

/// Pages through closed pull requests of a Gitea instance, keeping the
/// merged ones inside the filter's date range.
pub struct GiteaSource {
    client: Client,
    url: String,
}

impl GiteaSource {
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            client: Client::new(url, Auth::Token(token)),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for GiteaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiteaSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl PullRequestSource for GiteaSource {
    async fn fetch(
        &self,
        repository: &RepositoryRef,
        filter: &FetchFilter,
        config: &WorkerPoolConfig,
    ) -> Result<Vec<FetchRecord>, FetchError> {
        let limit = config.effective_limit(filter);
        let page_size = i64::try_from(config.page_size.max(1)).unwrap_or(i64::MAX);
        let pulls = self.client.pulls(&repository.owner, &repository.name);

        let mut page: i64 = 1;
        let mut records: Vec<FetchRecord> = vec![];
        loop {
            log::debug!(target: LOG_TARGET, "{repository}: fetching page #{page}");
            let gitea_pull_requests = pulls
                .list()
                .limit(page_size)
                .page(page)
                .state(State::Closed)
                .send(&self.client)
                .await
                .map_err(|e| FetchError::Api(e.to_string()))?;
            let page_records = gitea_pull_requests
                .iter()
                .map(pull_request_to_record)
                .collect::<Result<Vec<_>, _>>()?;

            // The server may clamp the page size, so only an empty page ends the listing.
            if collect_page(&mut records, page_records, filter, limit) == Paging::Done {
                break;
            }
            page += 1;
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Paging {
    Continue,
    Done,
}

/// Keeps the merged records of one page that fall inside the filter.
fn collect_page(
    records: &mut Vec<FetchRecord>,
    page: Vec<FetchRecord>,
    filter: &FetchFilter,
    limit: Option<usize>,
) -> Paging {
    if page.is_empty() {
        return Paging::Done;
    }
    records.extend(page.into_iter().filter(|record| {
        record
            .merged_at
            .is_some_and(|merged_at| filter.contains(merged_at))
    }));
    match limit {
        Some(limit) if records.len() >= limit => {
            records.truncate(limit);
            Paging::Done
        }
        _ => Paging::Continue,
    }
}

fn pull_request_to_record(pull_request: &GiteaPullRequest) -> Result<FetchRecord, FetchError> {
    to_record(
        pull_request.number,
        &pull_request.title,
        &pull_request.created_at,
        pull_request.merged_at.as_deref(),
        pull_request.closed_at.is_some(),
        &pull_request.user.login,
    )
}

fn to_record(
    number: i64,
    title: &str,
    created_at: &str,
    merged_at: Option<&str>,
    closed: bool,
    login: &str,
) -> Result<FetchRecord, FetchError> {
    let number = u64::try_from(number)
        .map_err(|_| FetchError::Parse(format!("invalid pull request number {number}")))?;
    let created_at = parse_timestamp(created_at)?;
    let merged_at = merged_at.map(parse_timestamp).transpose()?;
    let state = match (merged_at, closed) {
        (Some(_), _) => PullRequestState::Merged,
        (None, true) => PullRequestState::Closed,
        (None, false) => PullRequestState::Open,
    };
    Ok(FetchRecord::new(
        number,
        title,
        state,
        created_at,
        merged_at,
        Some(login.to_string()),
    ))
}
