use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestState {
    Open,
    Merged,
    Closed,
    #[serde(other)]
    Other,
}

/// One pull request as returned by a source.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FetchRecord {
    pub number: u64,
    pub title: String,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
}

// Create
impl FetchRecord {
    /// A `Merged` state without a merge timestamp is demoted to `Closed`, so
    /// every record in the pipeline upholds `Merged => merged_at.is_some()`.
    pub fn new(
        number: u64,
        title: impl ToString,
        state: PullRequestState,
        created_at: DateTime<Utc>,
        merged_at: Option<DateTime<Utc>>,
        author_login: Option<String>,
    ) -> Self {
        let state = match (state, merged_at) {
            (PullRequestState::Merged, None) => PullRequestState::Closed,
            (state, _) => state,
        };
        Self {
            number,
            title: title.to_string(),
            state,
            created_at,
            merged_at,
            author_login: author_login.filter(|login| !login.is_empty()),
        }
    }
}

impl FetchRecord {
    pub fn is_merged(&self) -> bool {
        self.state == PullRequestState::Merged && self.merged_at.is_some()
    }
}
