use crate::analyze::{Aggregated, AggregatedItem};
use crate::model::VerticalIndex;
use crate::pool::RepositoryResult;

const LOG_TARGET: &str = "aggregate";

/// Flattens per-repository results into one item per record.
///
/// Failed repositories are counted and logged, never fatal. Record order
/// within a repository is kept as the source returned it.
pub fn aggregate(
    results: impl IntoIterator<Item = RepositoryResult>,
    verticals: &VerticalIndex,
) -> Aggregated {
    results
        .into_iter()
        .fold(Aggregated::default(), |mut acc, result| {
            let key = result.repository.key();
            match result.outcome {
                Err(error) => {
                    log::warn!(
                        target: LOG_TARGET,
                        "failed to fetch pull requests for {key}: {error}"
                    );
                    acc.failure_count += 1;
                }
                Ok(records) => {
                    log::info!(target: LOG_TARGET, "{key}: found {} pull requests", records.len());
                    acc.success_count += 1;
                    let tags = verticals.get(&key).cloned().unwrap_or_default();
                    acc.items.extend(
                        records
                            .into_iter()
                            .map(|record| AggregatedItem::new(&key, tags.clone(), record)),
                    );
                }
            }
            acc
        })
}
