//! Template definitions and rendered message types

use crate::error::{MailError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key of the nested attachment templates inside a [`TemplateDefinition`]
pub const ATTACHMENTS_KEY: &str = "attachments";

/// Key of the rendered attachment sequence in a message projection
pub const ATTACHMENT_KEY: &str = "attachment";

/// Reserved data context key holding pass-through attachment descriptors
pub const DATA_ATTACHMENTS_KEY: &str = "_attachments";

/// Declarative message template
///
/// An ordered mapping from message field (`subject`, `from`, `to`, `html`,
/// `text`, ...) to a template string. The optional `attachments` key holds a
/// sequence of mappings, one per templated attachment.
///
/// Values are kept as raw JSON so that malformed definitions (non-string
/// fields, a single mapping instead of a sequence) are reported by the
/// compiler instead of being silently coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateDefinition(Map<String, Value>);

impl TemplateDefinition {
    /// Create an empty definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a definition from an arbitrary JSON value
    ///
    /// # Errors
    /// Returns [`MailError::Template`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MailError::Template(format!(
                "template definition must be a mapping, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a definition from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Add (or replace) a templated field
    pub fn field(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.0.insert(name.into(), Value::String(template.into()));
        self
    }

    /// Append a templated attachment
    ///
    /// ```
    /// use curled_mail::templates::TemplateDefinition;
    ///
    /// let definition = TemplateDefinition::new()
    ///     .field("subject", "Invoice {{number}}")
    ///     .attachment([("filename", "invoice-{{number}}.txt"), ("data", "{{total}}")]);
    ///
    /// assert_eq!(definition.as_map()["attachments"][0]["filename"], "invoice-{{number}}.txt");
    /// ```
    pub fn attachment<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attachment: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();

        let slot = self
            .0
            .entry(ATTACHMENTS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));

        match slot {
            Value::Array(items) => items.push(Value::Object(attachment)),
            other => *other = Value::Array(vec![Value::Object(attachment)]),
        }

        self
    }

    /// Raw view of the definition
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for TemplateDefinition {
    type Error = MailError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// One entry of a rendered message's `attachment` sequence
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentDescriptor {
    /// Fields rendered from a nested attachment template
    Templated(Map<String, Value>),
    /// HTML counterpart of the plain-text body
    Alternative { data: String },
    /// Opaque descriptor taken verbatim from the data context
    PassThrough(Value),
}

impl AttachmentDescriptor {
    /// JSON projection, as handed to transports
    pub fn to_value(&self) -> Value {
        match self {
            AttachmentDescriptor::Templated(fields) => Value::Object(fields.clone()),
            AttachmentDescriptor::Alternative { data } => {
                let mut map = Map::new();
                map.insert("data".to_string(), Value::String(data.clone()));
                map.insert("alternative".to_string(), Value::Bool(true));
                Value::Object(map)
            }
            AttachmentDescriptor::PassThrough(value) => value.clone(),
        }
    }

    pub fn is_alternative(&self) -> bool {
        match self {
            AttachmentDescriptor::Alternative { .. } => true,
            AttachmentDescriptor::Templated(_) => false,
            AttachmentDescriptor::PassThrough(value) => value
                .get("alternative")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

impl Serialize for AttachmentDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AttachmentDescriptor::Templated(fields) => fields.serialize(serializer),
            AttachmentDescriptor::Alternative { data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("data", data)?;
                map.serialize_entry("alternative", &true)?;
                map.end()
            }
            AttachmentDescriptor::PassThrough(value) => value.serialize(serializer),
        }
    }
}

/// Transport-ready message produced by the renderer
///
/// Holds one rendered string per template field (never `html`), the
/// `attachment` sequence and the legacy `attachments` slot. The legacy slot
/// is always present but never populated by rendering; consumers that still
/// read `attachments` get an empty sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedMessage {
    fields: Vec<(String, String)>,
    attachment: Vec<AttachmentDescriptor>,
    attachments: Vec<Value>,
}

impl RenderedMessage {
    /// Look up a rendered field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set a field, keeping its position if it already exists
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Remove a field, returning its value
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        let index = self.fields.iter().position(|(key, _)| key == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Rendered fields in template order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn subject(&self) -> Option<&str> {
        self.field("subject")
    }

    pub fn text(&self) -> Option<&str> {
        self.field("text")
    }

    pub fn attachment(&self) -> &[AttachmentDescriptor] {
        &self.attachment
    }

    pub fn push_attachment(&mut self, descriptor: AttachmentDescriptor) {
        self.attachment.push(descriptor);
    }

    /// The legacy `attachments` slot
    pub fn legacy_attachments(&self) -> &[Value] {
        &self.attachments
    }

    /// JSON projection of the whole message
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in self.projected_fields() {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        map.insert(
            ATTACHMENT_KEY.to_string(),
            Value::Array(self.attachment.iter().map(AttachmentDescriptor::to_value).collect()),
        );
        map.insert(
            ATTACHMENTS_KEY.to_string(),
            Value::Array(self.attachments.clone()),
        );
        Value::Object(map)
    }

    /// Fields that do not collide with the attachment slots of a projection
    fn projected_fields(&self) -> impl Iterator<Item = &(String, String)> {
        self.fields
            .iter()
            .filter(|(key, _)| key != ATTACHMENT_KEY && key != ATTACHMENTS_KEY)
    }
}

impl Serialize for RenderedMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields: Vec<_> = self.projected_fields().collect();
        let mut map = serializer.serialize_map(Some(fields.len() + 2))?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(ATTACHMENT_KEY, &self.attachment)?;
        map.serialize_entry(ATTACHMENTS_KEY, &self.attachments)?;
        map.end()
    }
}

/// Short name of a JSON value's type, for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
