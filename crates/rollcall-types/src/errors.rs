use thiserror::Error;

pub type Result<T, E = RollcallError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("page error: {0}")]
    Page(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
