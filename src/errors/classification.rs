use super::types::FlowscopeError;

/// Coarse error kind plus whether a retry can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl FlowscopeError {
    pub fn classify(&self) -> ErrorClassification {
        let (error_type, retryable) = match self {
            // Transient transport problems.
            Self::Network(_) => ("NetworkError", true),
            Self::Timeout(_) => ("TimeoutError", true),
            Self::Stream(_) => ("StreamError", true),
            Self::Io(_) => ("IoError", true),

            Self::Config(_) => ("ConfigError", false),
            Self::InvalidModel(_) => ("InvalidModelError", false),
            Self::UnknownTask(_) => ("UnknownTaskError", false),
            Self::Backend(_) => ("BackendError", false),
            Self::InvalidState(_) => ("InvalidStateError", false),
            Self::Json(_) => ("JsonError", false),
            Self::Yaml(_) => ("YamlError", false),
            Self::Internal(_) => ("InternalError", false),
        };
        ErrorClassification { error_type, retryable }
    }
}
