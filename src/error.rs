use thiserror::Error;

/// Errors surfaced by the simulator library and binary.
#[derive(Debug, Error)]
pub enum ServsimError {
    #[error("prometheus error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("metrics output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// A simulation step panicked; the state was rolled back to the
    /// previous tick.
    #[error("simulation step panicked: {0}")]
    StepPanicked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ServsimError>;
