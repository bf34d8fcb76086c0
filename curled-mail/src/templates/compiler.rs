//! Template compilation

use crate::error::{MailError, Result};
use crate::templates::engine::{CompiledField, InterpolationEngine};
use crate::templates::types::{json_kind, TemplateDefinition, ATTACHMENTS_KEY};
use serde_json::{Map, Value};
use tracing::debug;

/// Compiled fields of one nested attachment template
#[derive(Debug, Clone)]
pub struct CompiledAttachment {
    fields: Vec<CompiledField>,
}

impl CompiledAttachment {
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }
}

/// A template definition parsed once and ready to be rendered many times
///
/// Field order follows the source definition. The `attachments` key never
/// appears among the top-level fields: it is compiled into
/// [`CompiledAttachment`]s, one per source mapping, in source order.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    engine: InterpolationEngine,
    fields: Vec<CompiledField>,
    attachments: Vec<CompiledAttachment>,
    variables: Vec<String>,
}

impl CompiledTemplate {
    pub fn engine(&self) -> &InterpolationEngine {
        &self.engine
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn attachments(&self) -> &[CompiledAttachment] {
        &self.attachments
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    /// Placeholder names used anywhere in the template, sorted
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Compile a definition with a lenient engine
pub fn compile(definition: &TemplateDefinition) -> Result<CompiledTemplate> {
    compile_with(definition, InterpolationEngine::new())
}

/// Compile a definition with a strict engine (missing variables fail at render time)
pub fn compile_strict(definition: &TemplateDefinition) -> Result<CompiledTemplate> {
    compile_with(definition, InterpolationEngine::strict())
}

fn compile_with(
    definition: &TemplateDefinition,
    mut engine: InterpolationEngine,
) -> Result<CompiledTemplate> {
    let mut fields = Vec::new();
    let mut attachments = Vec::new();
    let mut variables = Vec::new();

    for (name, value) in definition.as_map() {
        if name == ATTACHMENTS_KEY {
            attachments = compile_attachments(&mut engine, &mut variables, value)?;
            continue;
        }

        let source = template_string(name, value)?;
        fields.push(engine.compile(name.clone(), name, source)?);
        variables.extend(InterpolationEngine::extract_variables(source));
    }

    variables.sort();
    variables.dedup();

    debug!(
        "Compiled template with {} fields and {} attachments",
        fields.len(),
        attachments.len()
    );

    Ok(CompiledTemplate {
        engine,
        fields,
        attachments,
        variables,
    })
}

fn compile_attachments(
    engine: &mut InterpolationEngine,
    variables: &mut Vec<String>,
    value: &Value,
) -> Result<Vec<CompiledAttachment>> {
    let items = value.as_array().ok_or_else(|| {
        MailError::Template(format!(
            "`{}` must be a sequence of mappings, got {}",
            ATTACHMENTS_KEY,
            json_kind(value)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mapping = item.as_object().ok_or_else(|| {
                MailError::Template(format!(
                    "`{}[{}]` must be a mapping, got {}",
                    ATTACHMENTS_KEY,
                    index,
                    json_kind(item)
                ))
            })?;
            compile_attachment(engine, variables, index, mapping)
        })
        .collect()
}

fn compile_attachment(
    engine: &mut InterpolationEngine,
    variables: &mut Vec<String>,
    index: usize,
    mapping: &Map<String, Value>,
) -> Result<CompiledAttachment> {
    let fields = mapping
        .iter()
        .map(|(name, value)| {
            let qualified = format!("{}[{}].{}", ATTACHMENTS_KEY, index, name);
            let source = template_string(&qualified, value)?;
            variables.extend(InterpolationEngine::extract_variables(source));
            engine.compile(qualified, name, source)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompiledAttachment { fields })
}

fn template_string<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        MailError::Template(format!(
            "field `{}` must be a template string, got {}",
            name,
            json_kind(value)
        ))
    })
}
