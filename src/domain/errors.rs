use reqwest::StatusCode;

// Failures talking to the storefront backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend returned {status}{}", message_suffix(.message))]
    Upstream {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("backend response decode error: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

impl ApiError {
    // Message supplied by the backend, if it sent one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            ApiError::Upstream { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

// Failures of the durable session mirror.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

// Structured outcome handed back by store operations in place of a raised error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("{0}")]
    Rejected(String),
}
