//! Mail client: a template registry bound to a transport

use crate::config::Config;
use crate::error::{MailError, Result, TransportError};
use crate::templates::{
    compile, compile_strict, CompiledTemplate, RenderedMessage, TemplateDefinition,
    TemplateRenderer,
};
use crate::transport::{ConnectionOptions, SendReceipt, SmtpTransport, Transport};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// How a send attempt resolved
///
/// Transport failures are values, not errors: `send` only returns `Err`
/// for problems on the caller's side (bad key, bad data, bad template).
#[derive(Debug)]
pub enum SendOutcome {
    Sent(SendReceipt),
    Failed(TransportError),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }

    pub fn receipt(&self) -> Option<&SendReceipt> {
        match self {
            SendOutcome::Sent(receipt) => Some(receipt),
            SendOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TransportError> {
        match self {
            SendOutcome::Sent(_) => None,
            SendOutcome::Failed(error) => Some(error),
        }
    }

    /// Turn a failed outcome back into an error
    pub fn into_result(self) -> Result<SendReceipt> {
        match self {
            SendOutcome::Sent(receipt) => Ok(receipt),
            SendOutcome::Failed(error) => Err(MailError::Transport(error)),
        }
    }
}

/// Templated mail client
///
/// Each client owns its template registry; nothing is shared between
/// clients. Sends borrow the client immutably and may run concurrently.
///
/// # Example
///
/// ```no_run
/// use curled_mail::{CurledMail, ConnectionOptions, TemplateDefinition};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut mail = CurledMail::new(ConnectionOptions {
///         host: Some("smtp.example.com".to_string()),
///         ..Default::default()
///     })?;
///
///     mail.add_template(
///         "welcome",
///         TemplateDefinition::new()
///             .field("from", "noreply@example.com")
///             .field("to", "{{email}}")
///             .field("subject", "Hi {{name}}")
///             .field("html", "<b>{{name}}</b>"),
///     )?;
///
///     let outcome = mail
///         .send("welcome", &json!({ "name": "Ada", "email": "ada@example.com" }))
///         .await?;
///     println!("sent: {}", outcome.is_sent());
///
///     Ok(())
/// }
/// ```
pub struct CurledMail<T: Transport = SmtpTransport> {
    transport: T,
    templates: HashMap<String, CompiledTemplate>,
    strict: bool,
}

impl CurledMail<SmtpTransport> {
    /// Build a client that delivers over SMTP
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(options: ConnectionOptions) -> Result<Self> {
        Ok(Self::with_transport(SmtpTransport::connect(options)?))
    }

    /// Build an SMTP client and register every configured template
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(config.transport.clone())?;
        client.add_templates(config)?;
        Ok(client)
    }
}

impl<T: Transport> CurledMail<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            templates: HashMap::new(),
            strict: false,
        }
    }

    /// Register every template of `config`
    pub fn add_templates(&mut self, config: &Config) -> Result<()> {
        for (key, definition) in &config.templates {
            self.add_template(key.clone(), definition.clone())?;
        }
        Ok(())
    }

    /// Make templates added from now on fail on missing variables
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Compile `definition` and store it under `key`
    ///
    /// Replaces any template already stored under the same key. On error the
    /// registry is left unchanged.
    pub fn add_template(
        &mut self,
        key: impl Into<String>,
        definition: TemplateDefinition,
    ) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(MailError::InvalidArgument(
                "template key must not be empty".to_string(),
            ));
        }

        let compiled = if self.strict {
            compile_strict(&definition)?
        } else {
            compile(&definition)?
        };

        if self.templates.insert(key.clone(), compiled).is_some() {
            info!("Replaced template '{}'", key);
        } else {
            info!("Registered template '{}'", key);
        }

        Ok(())
    }

    pub fn has_template(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn remove_template(&mut self, key: &str) -> bool {
        self.templates.remove(key).is_some()
    }

    /// Registered keys, sorted
    pub fn templates(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Render the template stored under `key` without sending it
    pub fn render(&self, key: &str, data: &Value) -> Result<RenderedMessage> {
        TemplateRenderer::render(self.lookup(key)?, data)
    }

    /// Placeholders of the template under `key` whose root name is absent
    /// from `data`
    ///
    /// Only top-level names are checked, so placeholders relative to an
    /// `{{#each}}` item are reported too.
    pub fn missing_variables(&self, key: &str, data: &Value) -> Result<Vec<String>> {
        let compiled = self.lookup(key)?;

        Ok(compiled
            .variables()
            .iter()
            .filter(|name| {
                let root = name.split(['.', '[']).next().unwrap_or_default();
                !root.is_empty()
                    && !root.starts_with('@')
                    && data.get(root).is_none()
            })
            .cloned()
            .collect())
    }

    fn lookup(&self, key: &str) -> Result<&CompiledTemplate> {
        if key.is_empty() {
            return Err(MailError::InvalidArgument(
                "template key must not be empty".to_string(),
            ));
        }

        self.templates
            .get(key)
            .ok_or_else(|| MailError::NotFound(format!("no template registered under '{}'", key)))
    }

    /// Render the template stored under `key` and hand it to the transport
    ///
    /// # Errors
    /// - [`MailError::InvalidArgument`] if `key` is empty
    /// - [`MailError::NotFound`] if no template is registered under `key`
    /// - [`MailError::Render`] if rendering fails
    ///
    /// A transport failure is not an error: it resolves to
    /// [`SendOutcome::Failed`].
    pub async fn send(&self, key: &str, data: &Value) -> Result<SendOutcome> {
        let message = self.render(key, data)?;
        debug!("Rendered '{}', handing over to transport", key);

        match self.transport.send_mail(&message).await {
            Ok(receipt) => {
                info!("Sent '{}'", key);
                Ok(SendOutcome::Sent(receipt))
            }
            Err(e) => {
                warn!("Transport failed for '{}': {}", key, e);
                Ok(SendOutcome::Failed(e))
            }
        }
    }
}
