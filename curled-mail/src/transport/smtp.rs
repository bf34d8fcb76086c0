//! SMTP transport for sending rendered messages
//!
//! Wraps a pooled lettre `AsyncSmtpTransport`. Connecting only prepares the
//! pool; the network is first touched by [`Transport::send_mail`].
//!
//! # Message mapping
//! - `from`, `to`, `cc`, `bcc`, `reply-to`, `sender` become address headers
//!   (comma-separated lists allowed)
//! - `subject` becomes the subject header
//! - `text` is the plain-text body
//! - the first `alternative: true` descriptor is the HTML body
//! - every other descriptor with `data` or `path` becomes an attachment,
//!   named by `name` or `filename` and typed by `type` or its extension

use crate::error::TransportError;
use crate::templates::RenderedMessage;
use crate::transport::options::{ConnectionOptions, SslOption};
use crate::transport::{SendReceipt, Transport};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Mailboxes, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Certificate, Tls, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// SMTP transport built from [`ConnectionOptions`]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    options: ConnectionOptions,
}

/// Attachment content resolved from a descriptor
struct FilePart {
    filename: String,
    content: Vec<u8>,
    content_type: ContentType,
}

impl SmtpTransport {
    /// Prepare a connection pool for the configured server
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`TransportError::Tls`] if the configured CA certificate
    /// cannot be read and [`TransportError::Smtp`] if TLS parameters are
    /// rejected.
    pub fn connect(options: ConnectionOptions) -> Result<Self, TransportError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(options.host())
            .port(options.port())
            .timeout(Some(Duration::from_millis(options.timeout)))
            .hello_name(ClientId::Domain(options.domain()))
            .tls(Self::tls_mode(&options)?);

        if let Some((user, password)) = options.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), password.to_string()));
        }

        info!(
            "SMTP transport prepared for {}:{} (ssl: {}, tls: {})",
            options.host(),
            options.port(),
            options.ssl.is_enabled(),
            options.tls.is_enabled()
        );

        Ok(Self {
            mailer: builder.build(),
            options,
        })
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    fn tls_mode(options: &ConnectionOptions) -> Result<Tls, TransportError> {
        let implicit = options.ssl.is_enabled();
        if !implicit && !options.tls.is_enabled() {
            return Ok(Tls::None);
        }

        let mut params = TlsParameters::builder(options.host().to_string());

        if let SslOption::Params(ssl) = &options.ssl {
            if let Some(ca) = &ssl.ca {
                let pem = std::fs::read(ca).map_err(|e| {
                    TransportError::Tls(format!("cannot read CA certificate {}: {}", ca, e))
                })?;
                params = params.add_root_certificate(Certificate::from_pem(&pem)?);
            }

            if ssl.key.is_some() || ssl.cert.is_some() {
                warn!("Client certificates are not supported, ignoring ssl.key/ssl.cert");
            }
        }

        let params = params.build()?;

        Ok(if implicit {
            Tls::Wrapper(params)
        } else {
            Tls::Required(params)
        })
    }

    /// Turn a rendered message into a MIME message
    ///
    /// # Errors
    /// - [`TransportError::Message`] if there is no `from` field
    /// - [`TransportError::Address`] if an address field does not parse
    /// - [`TransportError::Attachment`] if a descriptor has no content or its
    ///   file cannot be read
    /// - [`TransportError::Build`] if the message has no recipient
    pub async fn build_message(message: &RenderedMessage) -> Result<Message, TransportError> {
        let from = message
            .field("from")
            .filter(|from| !from.trim().is_empty())
            .ok_or_else(|| TransportError::Message("missing `from` field".to_string()))?;

        let mut builder = Message::builder().from(from.parse::<Mailbox>()?);

        for (name, value) in message.fields() {
            if value.trim().is_empty() {
                continue;
            }

            builder = match name {
                "to" => add_mailboxes(builder, value, MessageBuilder::to)?,
                "cc" => add_mailboxes(builder, value, MessageBuilder::cc)?,
                "bcc" => add_mailboxes(builder, value, MessageBuilder::bcc)?,
                "reply-to" | "reply_to" => add_mailboxes(builder, value, MessageBuilder::reply_to)?,
                "sender" => builder.sender(value.parse::<Mailbox>()?),
                "subject" => builder.subject(value),
                "from" | "text" => builder,
                other => {
                    debug!("Ignoring field `{}` with no header mapping", other);
                    builder
                }
            };
        }

        let text = message.text().unwrap_or_default().to_string();
        let mut html = None;
        let mut files = Vec::new();

        for (index, descriptor) in message.attachment().iter().enumerate() {
            let part = load_part(index, &descriptor.to_value()).await?;

            if html.is_none() && descriptor.is_alternative() {
                html = Some(String::from_utf8_lossy(&part.content).into_owned());
            } else {
                files.push(part);
            }
        }

        let body = match (html, files.is_empty()) {
            (None, true) => return Ok(builder.header(ContentType::TEXT_PLAIN).body(text)?),
            (Some(html), true) => MultiPart::alternative_plain_html(text, html),
            (Some(html), false) => {
                MultiPart::mixed().multipart(MultiPart::alternative_plain_html(text, html))
            }
            (None, false) => MultiPart::mixed().singlepart(SinglePart::plain(text)),
        };

        let body = files.into_iter().fold(body, |body, file| {
            body.singlepart(Attachment::new(file.filename).body(file.content, file.content_type))
        });

        Ok(builder.multipart(body)?)
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send_mail(&self, message: &RenderedMessage) -> Result<SendReceipt, TransportError> {
        let email = Self::build_message(message).await?;

        debug!(
            "Sending message to {:?} via {}:{}",
            email.envelope().to(),
            self.options.host(),
            self.options.port()
        );

        let response = self.mailer.send(email).await?;

        info!(
            "Mail accepted by {} with code {}",
            self.options.host(),
            response.code()
        );

        Ok(SendReceipt {
            code: Some(response.code().to_string()),
            response: response.message().map(str::to_string).collect(),
        })
    }
}

fn add_mailboxes(
    mut builder: MessageBuilder,
    list: &str,
    add: fn(MessageBuilder, Mailbox) -> MessageBuilder,
) -> Result<MessageBuilder, TransportError> {
    let mailboxes: Mailboxes = list.parse()?;
    for mailbox in mailboxes {
        builder = add(builder, mailbox);
    }
    Ok(builder)
}

async fn load_part(index: usize, descriptor: &Value) -> Result<FilePart, TransportError> {
    let object = descriptor.as_object().ok_or_else(|| {
        TransportError::Attachment(format!("attachment #{} must be a mapping", index))
    })?;

    let path = object.get("path").and_then(Value::as_str);
    let content = match (object.get("data").and_then(Value::as_str), path) {
        (Some(data), _) => data.as_bytes().to_vec(),
        (None, Some(path)) => tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::Attachment(format!("cannot read {}: {}", path, e)))?,
        (None, None) => {
            return Err(TransportError::Attachment(format!(
                "attachment #{} has neither `data` nor `path`",
                index
            )));
        }
    };

    let filename = ["name", "filename"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| {
            path.and_then(|p| Path::new(p).file_name())
                .map(|name| name.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| format!("attachment-{}", index + 1));

    let content_type = match object.get("type").and_then(Value::as_str) {
        Some(declared) => declared.to_string(),
        None => mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string(),
    };
    let content_type = ContentType::parse(&content_type).map_err(|e| {
        TransportError::Attachment(format!("invalid content type `{}`: {}", content_type, e))
    })?;

    Ok(FilePart {
        filename,
        content,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::AttachmentDescriptor;
    use crate::transport::options::SslParams;
    use serde_json::json;

    fn base_message() -> RenderedMessage {
        let mut message = RenderedMessage::default();
        message.set_field("from", "Sender <sender@example.com>");
        message.set_field("to", "ada@example.com, grace@example.com");
        message.set_field("subject", "Hi Ada");
        message.set_field("text", "Hello Ada");
        message
    }

    async fn formatted(message: &RenderedMessage) -> String {
        let email = SmtpTransport::build_message(message).await.unwrap();
        String::from_utf8(email.formatted()).unwrap()
    }

    #[tokio::test]
    async fn test_plain_message() {
        let raw = formatted(&base_message()).await;

        assert!(raw.contains("Subject: Hi Ada"));
        assert!(raw.contains("ada@example.com"));
        assert!(raw.contains("grace@example.com"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("Hello Ada"));
        assert!(!raw.contains("multipart"));
    }

    #[tokio::test]
    async fn test_alternative_body() {
        let mut message = base_message();
        message.push_attachment(AttachmentDescriptor::Alternative {
            data: "<b>Ada</b>".to_string(),
        });

        let raw = formatted(&message).await;

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<b>Ada</b>"));
        assert!(!raw.contains("multipart/mixed"));
    }

    #[tokio::test]
    async fn test_attachments_from_data_and_path() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        std::fs::write(file.path(), "a,b\n1,2\n").unwrap();

        let mut message = base_message();
        message.push_attachment(AttachmentDescriptor::Templated(
            json!({ "filename": "notes.txt", "data": "remember" })
                .as_object()
                .unwrap()
                .clone(),
        ));
        message.push_attachment(AttachmentDescriptor::Alternative {
            data: "<p>Hello</p>".to_string(),
        });
        message.push_attachment(AttachmentDescriptor::PassThrough(json!({
            "path": file.path().to_str().unwrap(),
        })));

        let raw = formatted(&message).await;
        let file_name = file.path().file_name().unwrap().to_str().unwrap();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("filename=\"notes.txt\""));
        assert!(raw.contains(file_name));
        assert!(raw.contains("text/csv"));
    }

    #[tokio::test]
    async fn test_missing_from() {
        let mut message = base_message();
        message.remove_field("from");

        let result = SmtpTransport::build_message(&message).await;
        assert!(matches!(result, Err(TransportError::Message(_))));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let mut message = base_message();
        message.set_field("to", "not an address");

        let result = SmtpTransport::build_message(&message).await;
        assert!(matches!(result, Err(TransportError::Address(_))));
    }

    #[tokio::test]
    async fn test_missing_recipient() {
        let mut message = base_message();
        message.remove_field("to");

        let result = SmtpTransport::build_message(&message).await;
        assert!(matches!(result, Err(TransportError::Build(_))));
    }

    #[tokio::test]
    async fn test_attachment_without_content() {
        let mut message = base_message();
        message.push_attachment(AttachmentDescriptor::PassThrough(json!({ "name": "x.txt" })));

        let result = SmtpTransport::build_message(&message).await;
        assert!(matches!(result, Err(TransportError::Attachment(_))));
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let transport = SmtpTransport::connect(ConnectionOptions {
            host: Some("smtp.invalid".to_string()),
            port: Some(2525),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(transport.options().port(), 2525);
    }

    #[tokio::test]
    async fn test_connect_with_implicit_tls() {
        let transport = SmtpTransport::connect(ConnectionOptions {
            host: Some("smtp.example.com".to_string()),
            ssl: SslOption::Flag(true),
            ..Default::default()
        });

        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_connect_with_missing_ca() {
        let result = SmtpTransport::connect(ConnectionOptions {
            ssl: SslOption::Params(SslParams {
                ca: Some("/nonexistent/ca.pem".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });

        assert!(matches!(result, Err(TransportError::Tls(_))));
    }
}
