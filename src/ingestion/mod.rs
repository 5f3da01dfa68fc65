pub mod classifier;
pub mod feed;
pub mod pipeline;
pub mod sink;

pub use classifier::TradeClassifier;
pub use feed::{EngineState, FeedConnection, FeedConnector, FeedError, FeedManager};
pub use sink::{event_sink, EventDrain, EventPublisher, SinkError};
