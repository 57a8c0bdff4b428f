use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesterError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Session creation failed: {0}")]
    SessionCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Stale element: {0}")]
    StaleElement(String),

    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("JavaScript execution failed: {0}")]
    ScriptFailed(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Session pool error: {0}")]
    PoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, TesterError>;

// Convert anyhow::Error to TesterError
impl From<anyhow::Error> for TesterError {
    fn from(err: anyhow::Error) -> Self {
        TesterError::AnyhowError(err.to_string())
    }
}
