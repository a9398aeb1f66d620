use hookrelay_common_api::EventRecord;
use thiserror::Error;

/// A Mapper is a source of EventRecords.
/// It remaps one unstructured inbound payload (e.g. a webhook body) into a
/// normalized EventRecord to be evaluated for dispatch.
pub trait Mapper<T> {
    /// Consumes an input and produces an EventRecord.
    fn to_record(&self, input: T) -> Result<EventRecord, MapperError>;
}

#[derive(Error, Debug)]
pub enum MapperError {
    /// Produce an error message depending on the error type.
    #[error("RecordCreationError: [{message}]")]
    RecordCreationError { message: String },
    #[error("JsonParsingError: [{message}]")]
    JsonParsingError { message: String },
    #[error("MapperCreationError: [{message}]")]
    MapperCreationError { message: String },
}
