//! Interpolation engine backed by handlebars
//!
//! Template strings use handlebars syntax: `{{var}}` (HTML-escaped),
//! `{{{var}}}` (raw), `{{#if}}`, `{{#each}}`, `{{#with}}`. Mustache sections
//! (`{{#list}}...{{/list}}`, `{{^list}}`) are not supported; use `{{#each}}`
//! and `{{#unless}}` instead. Each string is parsed once and stored under a
//! registry key; rendering only walks the parsed template.

use crate::error::{MailError, Result};
use handlebars::Handlebars;
use serde_json::Value;

/// Handle to one compiled template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledField {
    name: String,
    path: String,
    key: String,
}

impl CompiledField {
    /// Field name in the source definition
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location in the source definition (`subject`, `attachments[0].data`),
    /// used in errors
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Holds the parsed templates of one compiled message template
#[derive(Debug, Clone)]
pub struct InterpolationEngine {
    registry: Handlebars<'static>,
}

impl InterpolationEngine {
    /// Lenient engine: missing variables render as empty strings
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(escape_html);
        Self { registry }
    }

    /// Strict engine: rendering fails on variables absent from the data
    pub fn strict() -> Self {
        let mut engine = Self::new();
        engine.registry.set_strict_mode(true);
        engine
    }

    pub fn is_strict(&self) -> bool {
        self.registry.strict_mode()
    }

    /// Parse `source` and register it under a key unique to this engine
    ///
    /// `path` locates the string in its definition and only shows up in
    /// errors, so field names never clash with registry keys.
    pub fn compile(&mut self, path: String, name: &str, source: &str) -> Result<CompiledField> {
        let key = format!("#{}", self.registry.get_templates().len());

        self.registry
            .register_template_string(&key, source)
            .map_err(|e| MailError::Template(format!("field `{}`: {}", path, e)))?;

        Ok(CompiledField {
            name: name.to_string(),
            path,
            key,
        })
    }

    /// Render a compiled field against `data`
    pub fn render(&self, field: &CompiledField, data: &Value) -> Result<String> {
        self.registry
            .render(&field.key, data)
            .map_err(|e| MailError::Render(format!("field `{}`: {}", field.path, e)))
    }

    /// Extract all variable names from a template string
    ///
    /// Returns the names found between `{{ }}` markers, without block
    /// helpers (`#if`, `/if`, `else`) and without the extra braces of raw
    /// `{{{var}}}` placeholders. Sorted and deduplicated.
    pub fn extract_variables(template_str: &str) -> Vec<String> {
        let mut variables = Vec::new();
        let mut rest = template_str;

        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                break;
            };

            let inner = after[..end].trim_start_matches('{').trim();
            rest = &after[end + 2..];

            if inner.is_empty()
                || inner.starts_with(['#', '/', '!', '>', '^'])
                || inner == "else"
                || inner == "this"
            {
                continue;
            }

            // `{{var}}` or `{{helper var}}`: the last word is the variable
            if let Some(name) = inner.split_whitespace().last() {
                variables.push(name.to_string());
            }
        }

        variables.sort();
        variables.dedup();
        variables
    }
}

impl Default for InterpolationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape the characters mustache escapes (`&<>"'`) and nothing else
fn escape_html(data: &str) -> String {
    let mut escaped = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
