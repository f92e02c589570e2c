pub mod aggregation;
pub mod orchestrator;
pub mod session;

pub use aggregation::{
    bucket_name, AggregationEngine, AggregationState, Bucket, ScoreThresholdModel,
    SentimentModel, TextBlob, Vader,
};
pub use orchestrator::{Orchestrator, SearchContext, SearchOutcome};
pub use session::SearchSession;
