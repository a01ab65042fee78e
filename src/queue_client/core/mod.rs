mod aggregator;

pub use aggregator::DataAggregator;
