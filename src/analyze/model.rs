use crate::model::FetchRecord;

/// One pull request together with where it came from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AggregatedItem {
    pub repository: String,
    pub verticals: Vec<String>,
    pub record: FetchRecord,
}

impl AggregatedItem {
    pub fn new(repository: impl ToString, verticals: Vec<String>, record: FetchRecord) -> Self {
        Self {
            repository: repository.to_string(),
            verticals,
            record,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.record.is_merged()
    }
}

/// Terminal output of a run, handed to the reports.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Aggregated {
    pub items: Vec<AggregatedItem>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl Aggregated {
    pub fn merged(&self) -> impl Iterator<Item = &AggregatedItem> {
        self.items.iter().filter(|item| item.is_merged())
    }

    pub fn repositories_processed(&self) -> usize {
        self.success_count + self.failure_count
    }
}
