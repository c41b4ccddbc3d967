//! Generic configuration decoder
//!
//! [`decode`] interprets a [`Schema`] against a [`Body`] and returns the
//! typed values together with every problem found. Decoding never stops at
//! the first error:
//!
//! 1. attributes are evaluated and coerced to their field kind
//! 2. nested blocks are decoded recursively
//! 3. defaults fill absent fields
//! 4. the discriminated variant block is selected and decoded
//! 5. required fields that were not given at all are reported
//! 6. duration fields are parsed in a separate pass
//!
//! A field that was given but invalid is reported once, never again as missing.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::debug;

use crate::ast::{Block, Body, Expression, SourceRef};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::duration::parse_duration;
use crate::eval::EvalContext;
use crate::schema::{FieldKind, Schema, VariantSpec};
use crate::suggest::did_you_mean;

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    Integer(i64),
    StringList(Vec<String>),
    Duration(Duration),
}

/// Typed result of decoding a body against a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBody {
    values: IndexMap<&'static str, FieldValue>,
    blocks: IndexMap<&'static str, Vec<DecodedBody>>,
    variant: Option<(String, Box<DecodedBody>)>,
    // Given in the body but dropped with an error
    rejected: BTreeSet<&'static str>,
    range: SourceRef,
}

impl DecodedBody {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FieldValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn string_list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(FieldValue::StringList(list)) => Some(list),
            _ => None,
        }
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        match self.values.get(name) {
            Some(FieldValue::Duration(d)) => Some(*d),
            _ => None,
        }
    }

    /// Decoded instances of a nested block, empty if none were given
    pub fn blocks(&self, name: &str) -> &[DecodedBody] {
        self.blocks.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The selected variant tag and its decoded block
    pub fn variant(&self) -> Option<(&str, &DecodedBody)> {
        self.variant
            .as_ref()
            .map(|(tag, body)| (tag.as_str(), body.as_ref()))
    }

    /// Whether `name` was given but rejected
    ///
    /// Cross-field checks skip rejected fields, the decoder already
    /// reported them.
    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected.contains(name)
    }

    /// Location of the body this was decoded from
    pub fn range(&self) -> &SourceRef {
        &self.range
    }
}

/// Decode a present configuration body
pub fn decode(body: &Body, schema: &Schema, ctx: &EvalContext) -> (DecodedBody, Diagnostics) {
    let mut decoder = Decoder {
        ctx,
        check_required: true,
        diags: Diagnostics::new(),
    };
    let mut decoded = decoder.body(body, schema, Scope::Root);
    convert_durations(&mut decoded, schema, &mut decoder.diags);

    debug!(
        diagnostics = decoder.diags.len(),
        range = %body.range,
        "decoded configuration body"
    );
    (decoded, decoder.diags)
}

/// Decode an optional configuration body
///
/// An absent body on a schema with required fields yields exactly one
/// "component requires configuration" error. Defaults are still filled in,
/// without reporting the individual missing fields again.
pub fn decode_optional(
    body: Option<&Body>,
    schema: &Schema,
    ctx: &EvalContext,
) -> (DecodedBody, Diagnostics) {
    if let Some(body) = body {
        return decode(body, schema, ctx);
    }

    let mut decoder = Decoder {
        ctx,
        check_required: false,
        diags: Diagnostics::new(),
    };
    if schema.has_required_fields() {
        decoder.diags.push(Diagnostic::error(
            "component requires configuration",
            "component has required fields but no configuration block was provided",
        ));
    }

    let empty = Body::default();
    let mut decoded = decoder.body(&empty, schema, Scope::Root);
    convert_durations(&mut decoded, schema, &mut decoder.diags);
    (decoded, decoder.diags)
}

#[derive(Debug, Clone, Copy)]
enum Scope<'s> {
    Root,
    Block,
    Variant {
        discriminator: &'s str,
        tag: &'s str,
    },
}

struct Decoder<'a> {
    ctx: &'a EvalContext,
    check_required: bool,
    diags: Diagnostics,
}

impl Decoder<'_> {
    fn body(&mut self, body: &Body, schema: &Schema, scope: Scope<'_>) -> DecodedBody {
        let mut decoded = DecodedBody {
            range: body.range.clone(),
            ..Default::default()
        };
        // Fields given in the body, valid or not
        let mut given: HashSet<&'static str> = HashSet::new();

        for attr in body.attributes.values() {
            // `key:` with no value is the same as leaving it out
            if attr.expr == Expression::Literal(JsonValue::Null) {
                continue;
            }

            // `toleration: []` declares zero blocks
            if attr.expr == Expression::List(Vec::new())
                && schema.get_block(&attr.name).is_some_and(|spec| spec.repeated)
            {
                continue;
            }

            let Some(spec) = schema.get_field(&attr.name) else {
                self.unsupported_argument(&attr.name, &attr.range, schema);
                continue;
            };

            let value = match self.ctx.evaluate(&attr.expr) {
                Ok(JsonValue::Null) => continue,
                Ok(value) => value,
                Err(err) => {
                    given.insert(spec.name);
                    self.diags.push(
                        Diagnostic::error("Invalid expression", err.to_string())
                            .with_subject(attr.range.clone()),
                    );
                    continue;
                }
            };
            given.insert(spec.name);

            let Some(value) = coerce(value, spec.kind) else {
                self.diags.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "Inappropriate value for attribute \"{}\": {} required.",
                            spec.name,
                            spec.kind.describe()
                        ),
                    )
                    .with_subject(attr.range.clone()),
                );
                continue;
            };

            if let (Some(allowed), FieldValue::String(s)) = (spec.allowed, &value) {
                if !allowed.contains(&s.as_str()) {
                    self.diags.push(
                        Diagnostic::error(
                            format!("Unknown {} \"{}\"", spec.name.replace('_', " "), s),
                            format!("'{}' must be one of: {}", spec.name, quoted_list(allowed)),
                        )
                        .with_subject(attr.range.clone()),
                    );
                    continue;
                }
            }

            decoded.values.insert(spec.name, value);
        }

        let mut variant_blocks: Vec<&Block> = Vec::new();
        for block in &body.blocks {
            if let Some(spec) = schema.get_block(&block.kind) {
                let already = decoded.blocks.get(spec.name).map_or(0, Vec::len);
                if !spec.repeated && already > 0 {
                    self.duplicate_block(block);
                    continue;
                }
                let nested = self.body(&block.body, &spec.schema, Scope::Block);
                decoded.blocks.entry(spec.name).or_default().push(nested);
            } else if schema
                .variants
                .as_ref()
                .is_some_and(|v| v.get(&block.kind).is_some())
            {
                variant_blocks.push(block);
            } else if schema.get_field(&block.kind).is_some() {
                self.diags.push(
                    Diagnostic::error(
                        "Unsupported block type",
                        format!(
                            "Blocks of type \"{}\" are not expected here. Did you mean to define argument \"{}\"?",
                            block.kind, block.kind
                        ),
                    )
                    .with_subject(block.range.clone()),
                );
            } else {
                let suggestion = did_you_mean(&block.kind, schema.known_names());
                self.diags.push(
                    Diagnostic::error(
                        "Unsupported block type",
                        format!(
                            "Blocks of type \"{}\" are not expected here.{}",
                            block.kind, suggestion
                        ),
                    )
                    .with_subject(block.range.clone()),
                );
            }
        }

        decoded.rejected = given
            .iter()
            .copied()
            .filter(|name| !decoded.values.contains_key(name))
            .collect();

        for spec in &schema.fields {
            if given.contains(spec.name) || decoded.values.contains_key(spec.name) {
                continue;
            }
            if let Some(value) = spec.default.clone().and_then(|d| coerce(d, spec.kind)) {
                decoded.values.insert(spec.name, value);
            }
        }

        if self.check_required {
            for spec in schema.fields.iter().filter(|f| f.required) {
                if given.contains(spec.name) || decoded.values.contains_key(spec.name) {
                    continue;
                }
                let detail = match scope {
                    Scope::Variant { discriminator, tag } => format!(
                        "When using '{}' {}, '{}' must be set but it was not found",
                        tag, discriminator, spec.name
                    ),
                    Scope::Root | Scope::Block => {
                        format!("'{}' is a required argument but it was not found", spec.name)
                    }
                };
                self.diags.push(
                    Diagnostic::error(format!("'{}' must be set", spec.name), detail)
                        .with_subject(body.range.child(spec.name)),
                );
            }
        }

        if let Some(variants) = &schema.variants {
            self.variant(&mut decoded, body, variants, &variant_blocks, &given);
        }

        decoded
    }

    fn variant(
        &mut self,
        decoded: &mut DecodedBody,
        body: &Body,
        variants: &VariantSpec,
        payloads: &[&Block],
        given: &HashSet<&'static str>,
    ) {
        let discriminator = variants.discriminator;
        let subject = body
            .attribute(discriminator)
            .map(|a| a.range.clone())
            .unwrap_or_else(|| body.range.child(discriminator));

        let Some(tag) = decoded.string(discriminator).map(str::to_string) else {
            // Invalid or missing discriminator was already reported
            if !given.contains(discriminator) {
                for block in payloads {
                    self.diags.push(
                        Diagnostic::error(
                            format!("Unexpected \"{}\" block", block.kind),
                            format!("'{}' must be set to use a '{}' block", discriminator, block.kind),
                        )
                        .with_subject(block.range.clone()),
                    );
                }
            }
            return;
        };

        let Some(variant_schema) = variants.get(&tag) else {
            let supported: Vec<&str> = variants.tags().collect();
            self.diags.push(
                Diagnostic::error(
                    format!("Make sure to set {} to one of supported values", discriminator),
                    format!("{} must be one of: {}", discriminator, quoted_list(&supported)),
                )
                .with_subject(subject),
            );
            return;
        };

        let mut selected: Option<&Block> = None;
        for block in payloads {
            if block.kind != tag {
                self.diags.push(
                    Diagnostic::error(
                        format!("Unexpected \"{}\" block", block.kind),
                        format!(
                            "'{}' block cannot be used when {} is '{}'",
                            block.kind, discriminator, tag
                        ),
                    )
                    .with_subject(block.range.clone()),
                );
            } else if selected.is_some() {
                self.duplicate_block(block);
            } else {
                selected = Some(block);
            }
        }

        let scope = Scope::Variant {
            discriminator,
            tag: &tag,
        };
        let nested = match selected {
            Some(block) => self.body(&block.body, variant_schema, scope),
            None => {
                if self.check_required {
                    self.diags.push(
                        Diagnostic::error(
                            format!("'{}' block must exist", tag),
                            format!("When using '{}' {}, '{}' block must be present", tag, discriminator, tag),
                        )
                        .with_subject(body.range.child(&tag)),
                    );
                }
                let synthesized = Body::empty(body.range.child(&tag));
                self.body(&synthesized, variant_schema, scope)
            }
        };

        decoded.variant = Some((tag, Box::new(nested)));
    }

    fn unsupported_argument(&mut self, name: &str, range: &SourceRef, schema: &Schema) {
        let is_block = schema.get_block(name).is_some()
            || schema
                .variants
                .as_ref()
                .is_some_and(|v| v.get(name).is_some());

        let detail = if is_block {
            format!(
                "An argument named \"{}\" is not expected here. Did you mean to define a block of type \"{}\"?",
                name, name
            )
        } else {
            format!(
                "An argument named \"{}\" is not expected here.{}",
                name,
                did_you_mean(name, schema.known_names())
            )
        };

        self.diags.push(
            Diagnostic::error("Unsupported argument", detail).with_subject(range.clone()),
        );
    }

    fn duplicate_block(&mut self, block: &Block) {
        self.diags.push(
            Diagnostic::error(
                format!("Duplicate {} block", block.kind),
                format!(
                    "Only one \"{}\" block is allowed. Another was defined earlier.",
                    block.kind
                ),
            )
            .with_subject(block.range.clone()),
        );
    }
}

/// Parse raw duration strings into durations
///
/// Failures are reported per field and remove the raw value, so a decoded
/// body never carries an unparsed duration.
fn convert_durations(decoded: &mut DecodedBody, schema: &Schema, diags: &mut Diagnostics) {
    for spec in schema.fields.iter().filter(|f| f.kind == FieldKind::Duration) {
        let raw = match decoded.values.get(spec.name) {
            Some(FieldValue::String(raw)) => raw.clone(),
            _ => continue,
        };

        match parse_duration(&raw) {
            Ok(duration) => {
                decoded.values.insert(spec.name, FieldValue::Duration(duration));
            }
            Err(err) => {
                diags.push(
                    Diagnostic::error(
                        format!("error parsing '{}'", spec.name),
                        format!("error parsing '{}': {}", spec.name, err),
                    )
                    .with_subject(decoded.range.child(spec.name)),
                );
                decoded.values.shift_remove(spec.name);
                decoded.rejected.insert(spec.name);
            }
        }
    }

    for block_spec in &schema.blocks {
        if let Some(entries) = decoded.blocks.get_mut(block_spec.name) {
            for entry in entries {
                convert_durations(entry, &block_spec.schema, diags);
            }
        }
    }

    if let (Some(variants), Some((tag, nested))) = (&schema.variants, decoded.variant.as_mut()) {
        if let Some(variant_schema) = variants.get(tag) {
            convert_durations(nested, variant_schema, diags);
        }
    }
}

fn coerce(value: JsonValue, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::String | FieldKind::Duration => scalar_to_string(&value).map(FieldValue::String),
        FieldKind::Bool => match value {
            JsonValue::Bool(b) => Some(FieldValue::Bool(b)),
            JsonValue::String(s) if s == "true" => Some(FieldValue::Bool(true)),
            JsonValue::String(s) if s == "false" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        FieldKind::Integer => match &value {
            JsonValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(FieldValue::Integer),
        FieldKind::StringList => match &value {
            JsonValue::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::StringList),
            _ => None,
        },
    }
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn quoted_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|i| format!("'{}'", i))
        .collect::<Vec<_>>()
        .join(", ")
}
