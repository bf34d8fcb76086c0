//! Mail transports
//!
//! A [`Transport`] delivers one rendered message per call. The client never
//! retries or batches; whatever the transport reports is final.

pub mod memory;
pub mod options;
pub mod smtp;

pub use memory::MemoryTransport;
pub use options::{ConnectionOptions, SslOption, SslParams, TlsOption};
pub use smtp::SmtpTransport;

use crate::error::TransportError;
use crate::templates::RenderedMessage;
use async_trait::async_trait;
use serde::Serialize;

/// What a transport reports after accepting a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Reply code of the final server response, when there is a server
    pub code: Option<String>,
    /// Lines of the final server response
    pub response: Vec<String>,
}

/// Delivers rendered messages
///
/// Implementations must tolerate concurrent calls: the client issues one
/// call per `send` and never serializes them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one message; exactly one delivery attempt
    async fn send_mail(&self, message: &RenderedMessage) -> Result<SendReceipt, TransportError>;
}
