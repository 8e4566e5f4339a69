use crate::pool::RepositoryResult;
use crate::utils::ProgressStyleTemplate;
use indicatif::{MultiProgress, ProgressBar};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

pub trait MultiProgressNew {
    /// Adds a bar counting finished repositories out of `repositories`.
    fn add_repository_bar(&self, repositories: usize) -> RepositoryProgress;
}

impl MultiProgressNew for MultiProgress {
    fn add_repository_bar(&self, repositories: usize) -> RepositoryProgress {
        let bar = self.add(ProgressBar::new(repositories as u64));
        bar.set_style(ProgressStyleTemplate::repository_bar());
        bar.set_message("Fetching...");
        bar.enable_steady_tick(TICK);
        RepositoryProgress {
            bar,
            collected: 0,
            failed: 0,
        }
    }
}

/// Progress over the results of one pool run. Failures are only counted
/// here, the aggregator logs them.
pub struct RepositoryProgress {
    bar: ProgressBar,
    collected: usize,
    failed: usize,
}

impl RepositoryProgress {
    pub fn on_result(&mut self, result: &RepositoryResult) {
        match result.error() {
            Some(_) => self.failed += 1,
            None => self.collected += result.records().len(),
        }
        self.bar.set_message(format!(
            "{} ({} PRs, {} failed)",
            result.repository, self.collected, self.failed
        ));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.set_style(ProgressStyleTemplate::only_message());
        self.bar.finish_with_message(format!(
            "✅ Completed fetch ({} repositories, {} pull requests, {} failed)",
            self.bar.position(),
            self.collected,
            self.failed
        ));
    }
}
