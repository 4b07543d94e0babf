//! Controllable mock implementations of the stage adapters for tests.

mod mock_extractor;
mod mock_fetcher;
mod mock_publisher;
mod mock_transcriber;

pub use mock_extractor::MockExtractor;
pub use mock_fetcher::MockFetcher;
pub use mock_publisher::{MockPublisher, RecordedPublish};
pub use mock_transcriber::MockTranscriber;
