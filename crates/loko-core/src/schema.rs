//! Explicit configuration schema descriptions
//!
//! Every component describes its configuration with a [`Schema`] instead of
//! relying on reflection. The generic decoder in [`crate::decode`] interprets
//! the description.

use serde_json::Value as JsonValue;

/// The type a field is decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
    StringList,
    /// Kept as a raw string by the decoder, parsed in a second pass
    Duration,
}

impl FieldKind {
    /// Type name used in "... required" messages
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Duration => "string",
            FieldKind::Bool => "bool",
            FieldKind::Integer => "number",
            FieldKind::StringList => "list of string",
        }
    }
}

/// Description of one scalar or list field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<JsonValue>,
    /// Allow-list for enum-like fields
    pub allowed: Option<&'static [&'static str]>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            allowed: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn string_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    pub fn duration(name: &'static str) -> Self {
        Self::new(name, FieldKind::Duration)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Description of a nested block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub name: &'static str,
    pub repeated: bool,
    pub schema: Schema,
}

impl BlockSpec {
    /// A block that may appear at most once
    pub fn single(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            repeated: false,
            schema,
        }
    }

    /// A block that may appear any number of times
    pub fn repeated(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            repeated: true,
            schema,
        }
    }
}

/// A tagged union of sub-blocks selected by a discriminator field
///
/// The discriminator is an ordinary string field of the same schema. The
/// block named after the selected tag is mandatory; blocks named after
/// other variants are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub discriminator: &'static str,
    pub variants: Vec<(&'static str, Schema)>,
}

impl VariantSpec {
    pub fn new(discriminator: &'static str) -> Self {
        Self {
            discriminator,
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, tag: &'static str, schema: Schema) -> Self {
        self.variants.push((tag, schema));
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Schema> {
        self.variants
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, schema)| schema)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.variants.iter().map(|(name, _)| *name)
    }
}

/// Configuration schema of a component or block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
    pub blocks: Vec<BlockSpec>,
    pub variants: Option<VariantSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn block(mut self, block: BlockSpec) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn variants(mut self, variants: VariantSpec) -> Self {
        self.variants = Some(variants);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_block(&self, name: &str) -> Option<&BlockSpec> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Whether the schema has at least one required field of its own
    pub fn has_required_fields(&self) -> bool {
        self.fields.iter().any(|f| f.required)
    }

    /// A schema with no fields, blocks or variants accepts no configuration
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.blocks.is_empty() && self.variants.is_none()
    }

    /// Names of everything that may appear in a body of this schema
    pub fn known_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|f| f.name)
            .chain(self.blocks.iter().map(|b| b.name))
            .chain(self.variants.iter().flat_map(|v| v.tags()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new()
            .field(FieldSpec::string("provider").default("packet"))
            .field(FieldSpec::string("cluster_name").required())
            .block(BlockSpec::repeated("toleration", Schema::new()))
            .variants(VariantSpec::new("provider").variant("packet", Schema::new()))
    }

    #[test]
    fn test_builder() {
        let schema = sample();
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(
            schema.get_field("provider").unwrap().default,
            Some(JsonValue::String("packet".into()))
        );
        assert!(schema.get_block("toleration").unwrap().repeated);
        assert!(schema.has_required_fields());
        assert!(!schema.is_empty());
    }

    #[test]
    fn test_known_names() {
        let names: Vec<_> = sample().known_names().collect();
        assert_eq!(names, vec!["provider", "cluster_name", "toleration", "packet"]);
    }

    #[test]
    fn test_empty_schema() {
        assert!(Schema::new().is_empty());
        assert!(!Schema::new().has_required_fields());
    }
}
