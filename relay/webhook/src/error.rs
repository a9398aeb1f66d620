use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("ConfigurationError: {message}")]
    ConfigurationError { message: String },
}
