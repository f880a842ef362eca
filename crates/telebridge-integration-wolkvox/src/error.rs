//! Wolkvox client errors

use telebridge::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WolkvoxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Wolkvox API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode Wolkvox response: {0}")]
    Decode(String),

    #[error("Invalid Wolkvox configuration: {0}")]
    Config(String),
}

impl From<WolkvoxError> for DomainError {
    fn from(e: WolkvoxError) -> Self {
        DomainError::ExternalService(format!("wolkvox: {e}"))
    }
}
