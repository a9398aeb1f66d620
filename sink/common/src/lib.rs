use hookrelay_common_api::FlatData;
use thiserror::Error;

/// A Sink delivers completed EventRecords to an analytics ingestion provider.
/// The dispatch gate invokes it from a detached task and only consumes the
/// outcome through a logger, so implementations must report failures through
/// the Result and never panic.
#[async_trait::async_trait(?Send)]
pub trait Sink {
    /// Delivers one event to the ingestion provider.
    async fn track(&self, event_name: &str, data: &FlatData) -> Result<(), SinkError>;
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum SinkError {
    #[error("TrackDeliveryError: [{message}]")]
    TrackDeliveryError { message: String },
    #[error("ConfigurationError: [{message}]")]
    ConfigurationError { message: String },
}
