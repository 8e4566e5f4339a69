mod aggregator;
mod model;

pub use aggregator::aggregate;
pub use model::{Aggregated, AggregatedItem};
