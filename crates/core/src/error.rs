use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid deadline '{value}': {reason}")]
    InvalidDeadline { value: String, reason: String },

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
}
