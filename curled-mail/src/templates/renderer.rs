//! Message rendering with HTML/plain-text merging

use crate::error::{MailError, Result};
use crate::templates::compiler::CompiledTemplate;
use crate::templates::html2text::html_to_text;
use crate::templates::types::{
    json_kind, AttachmentDescriptor, RenderedMessage, DATA_ATTACHMENTS_KEY,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Renders compiled templates into transport-ready messages
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a compiled template with a data context
    ///
    /// The `attachment` sequence of the result is, in this order:
    /// 1. the nested attachment templates, in definition order
    /// 2. the HTML alternative body, if the template rendered a non-empty `html`
    /// 3. the entries of `data._attachments`, verbatim
    ///
    /// A non-empty `html` field is moved out of the message; when there is
    /// no non-empty `text` field, one is derived from the HTML.
    ///
    /// # Errors
    /// - [`MailError::Render`] if `data` is not an object
    /// - [`MailError::Render`] if `data._attachments` is not a sequence
    /// - [`MailError::Render`] if a field fails to interpolate
    pub fn render(compiled: &CompiledTemplate, data: &Value) -> Result<RenderedMessage> {
        if !data.is_object() {
            return Err(MailError::Render(format!(
                "data context must be a mapping, got {}",
                json_kind(data)
            )));
        }

        let engine = compiled.engine();
        let mut message = RenderedMessage::default();

        for field in compiled.fields() {
            message.set_field(field.name(), engine.render(field, data)?);
        }

        for attachment in compiled.attachments() {
            let mut rendered = Map::new();
            for field in attachment.fields() {
                rendered.insert(
                    field.name().to_string(),
                    Value::String(engine.render(field, data)?),
                );
            }
            message.push_attachment(AttachmentDescriptor::Templated(rendered));
        }

        if let Some(html) = message.remove_field("html") {
            if !html.is_empty() {
                if message.text().map_or(true, str::is_empty) {
                    message.set_field("text", html_to_text(&html));
                }
                message.push_attachment(AttachmentDescriptor::Alternative { data: html });
            }
        }

        match data.get(DATA_ATTACHMENTS_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    message.push_attachment(AttachmentDescriptor::PassThrough(item.clone()));
                }
            }
            Some(other) => {
                return Err(MailError::Render(format!(
                    "`{}` must be a sequence, got {}",
                    DATA_ATTACHMENTS_KEY,
                    json_kind(other)
                )));
            }
        }

        debug!(
            "Rendered message with {} attachment entries",
            message.attachment().len()
        );

        Ok(message)
    }
}
