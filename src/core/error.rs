use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Non unique result: {0}")]
    NonUniqueResult(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Converter error: {0}")]
    Converter(String),

    #[error("Listener error: {0}")]
    Listener(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;

impl<T> From<std::sync::PoisonError<T>> for MapperError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
