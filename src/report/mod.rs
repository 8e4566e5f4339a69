pub mod excel;
pub mod markdown;

use crate::analyze::{Aggregated, AggregatedItem};
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// Where pull request links point to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Host {
    GitHub,
    Gitea { url: String },
}

impl Host {
    pub fn pull_url(&self, repository: &str, number: u64) -> String {
        match self {
            Host::GitHub => format!("https://github.com/{repository}/pull/{number}"),
            Host::Gitea { url } => format!("{url}/{repository}/pulls/{number}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub host: Host,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            generated_at: Utc::now(),
        }
    }
}

/// Merged pull requests of one repository, newest number first.
pub(crate) struct RepositoryGroup<'a> {
    pub repository: &'a str,
    pub verticals: &'a [String],
    pub items: Vec<&'a AggregatedItem>,
}

/// Groups merged items by repository, sorted by repository key.
pub(crate) fn merged_by_repository(aggregated: &Aggregated) -> Vec<RepositoryGroup<'_>> {
    aggregated
        .merged()
        .into_group_map_by(|&item| item.repository.as_str())
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(repository, items)| RepositoryGroup {
            repository,
            verticals: items.first().copied().map_or(&[][..], |item| item.verticals.as_slice()),
            items: items
                .into_iter()
                .sorted_by(|a, b| b.record.number.cmp(&a.record.number))
                .collect(),
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_and_gitea_links() {
        assert_eq!(Host::GitHub.pull_url("acme/api", 7), "https://github.com/acme/api/pull/7");
        let gitea = Host::Gitea {
            url: "https://git.example.com".to_string(),
        };
        assert_eq!(gitea.pull_url("acme/api", 7), "https://git.example.com/acme/api/pulls/7");
    }

    #[test]
    fn groups_only_merged_and_sorts() {
        let aggregated = fixtures::sample();
        let groups = merged_by_repository(&aggregated);
        let repositories = groups.iter().map(|g| g.repository).collect::<Vec<_>>();
        assert_eq!(repositories, vec!["acme/api", "acme/web"]);
        let numbers = groups[0].items.iter().map(|i| i.record.number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![12, 10]);
        assert_eq!(groups[0].verticals, ["Provider", "Payer"]);
    }
}
