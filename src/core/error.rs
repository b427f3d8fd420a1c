use thiserror::Error;

#[derive(Error, Debug)]
pub enum DmlError {
    #[error("Table '{0}' is not registered")]
    UnknownTable(String),
    #[error("Field '{0}' does not exist on table '{1}'")]
    UnknownField(String, String),
    #[error("Malformed criteria: {0}")]
    MalformedCriteria(String),
    #[error("Type mismatch for field '{0}': {1}")]
    TypeMismatch(String, String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
