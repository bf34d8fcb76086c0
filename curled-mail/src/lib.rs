//! curled-mail: templated email sending
//!
//! Register declarative message templates once, then send them with a data
//! context. Templates are compiled up front; rendering merges HTML and
//! plain-text bodies and assembles attachments before handing the message to
//! a transport.
//!
//! # Features
//!
//! - **Templates**: `{{placeholder}}` interpolation in every field, nested
//!   attachment templates, per-send attachments via `_attachments`
//! - **HTML**: an HTML body is sent as an alternative part, with a plain-text
//!   fallback derived from it when the template has no `text`
//! - **Transports**: SMTP (implicit TLS, STARTTLS, auth) or an in-memory
//!   outbox for dry runs and tests
//!
//! # Example
//!
//! ```no_run
//! use curled_mail::config::Config;
//! use curled_mail::CurledMail;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("curled-mail.toml")?;
//!     let mail = CurledMail::from_config(&config)?;
//!
//!     mail.send("welcome", &json!({ "name": "Ada", "email": "ada@example.com" }))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`client`]: Template registry and send API
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`templates`]: Template compilation and rendering
//! - [`transport`]: SMTP and in-memory transports

pub mod client;
pub mod config;
pub mod error;
pub mod templates;
pub mod transport;

pub use client::{CurledMail, SendOutcome};
pub use error::{MailError, Result, TransportError};
pub use templates::{AttachmentDescriptor, RenderedMessage, TemplateDefinition};
pub use transport::{ConnectionOptions, MemoryTransport, SendReceipt, SmtpTransport, Transport};
