use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures raised by a [`Transport`](crate::transport::Transport) while
/// delivering a rendered message.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid message: {0}")]
    Message(String),

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, MailError>;
