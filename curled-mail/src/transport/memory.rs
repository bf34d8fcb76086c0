//! In-process transport that keeps every message in an outbox

use crate::error::TransportError;
use crate::templates::RenderedMessage;
use crate::transport::{SendReceipt, Transport};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

/// Records rendered messages instead of delivering them
///
/// Used for dry runs and tests. A transport built with
/// [`MemoryTransport::failing`] rejects every message and records nothing.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<RenderedMessage>>,
    failure: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that rejects every message with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    /// Messages accepted so far, in submission order
    pub fn messages(&self) -> Vec<RenderedMessage> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.outbox.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_mail(&self, message: &RenderedMessage) -> Result<SendReceipt, TransportError> {
        if let Some(reason) = &self.failure {
            return Err(TransportError::Rejected(reason.clone()));
        }

        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| TransportError::Rejected("outbox lock poisoned".to_string()))?;
        outbox.push(message.clone());
        let id = outbox.len();

        debug!("Stored message #{} in memory outbox", id);

        Ok(SendReceipt {
            code: None,
            response: vec![format!("queued as {}", id)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str) -> RenderedMessage {
        let mut message = RenderedMessage::default();
        message.set_field("subject", subject);
        message
    }

    #[tokio::test]
    async fn test_outbox_records_in_order() {
        let transport = MemoryTransport::new();

        let first = transport.send_mail(&message("one")).await.unwrap();
        transport.send_mail(&message("two")).await.unwrap();

        assert_eq!(first.response, vec!["queued as 1"]);
        let subjects: Vec<String> = transport
            .messages()
            .iter()
            .filter_map(|m| m.subject().map(str::to_string))
            .collect();
        assert_eq!(subjects, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_failing_transport() {
        let transport = MemoryTransport::failing("mailbox full");

        let result = transport.send_mail(&message("one")).await;

        assert!(matches!(result, Err(TransportError::Rejected(ref r)) if r == "mailbox full"));
        assert!(transport.is_empty());
    }
}
