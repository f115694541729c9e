mod aggregator;

pub use aggregator::{Role, TranscriptAggregator, TranscriptEntry};
