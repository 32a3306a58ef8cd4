use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowscopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid workflow model: {0}")]
    InvalidModel(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Backend rejected request: {0}")]
    Backend(String),

    #[error("Event stream error: {0}")]
    Stream(String),

    #[error("Invalid execution state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
