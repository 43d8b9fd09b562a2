use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template arity mismatch: expected {expected} indices, got {got}")]
    TemplateArityMismatch { expected: usize, got: usize },

    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    #[error("Missing target selector for action: {action}")]
    MissingTarget { action: String },

    #[error("Missing key path for action: {action}")]
    MissingKeyPath { action: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Control did not become clickable: {selector}")]
    ControlTimeout { selector: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Fatal context error: {0}")]
    FatalContext(String),

    #[error("API request to {url} failed with status {status}")]
    ApiStatus { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors that abort the whole run rather than the current unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::FatalContext(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, EngineError>;
