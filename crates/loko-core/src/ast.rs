//! Configuration AST
//!
//! A component's configuration arrives as a generic tree of attributes and
//! nested blocks, independent of any component schema. The tree is built
//! from YAML with these rules:
//!
//! - a mapping value becomes one nested block
//! - a non-empty sequence of mappings becomes repeated blocks of that kind
//! - every other value becomes an attribute
//!
//! Strings containing `${` are kept as unevaluated templates so expressions
//! are resolved against an [`EvalContext`](crate::eval::EvalContext) at decode time.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::fmt;

use crate::error::{CoreError, Result};

/// Location of a configuration element, used in diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SourceRef {
    /// File the element was read from, if any
    pub file: Option<String>,

    /// Dotted path of the element inside the file
    pub path: String,
}

impl SourceRef {
    pub fn new(file: Option<String>, path: impl Into<String>) -> Self {
        Self {
            file,
            path: path.into(),
        }
    }

    /// Reference to a child element
    pub fn child(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        };
        Self {
            file: self.file.clone(),
            path,
        }
    }

    /// Reference to the n-th element of a repeated child
    pub fn indexed(&self, name: &str, index: usize) -> Self {
        let mut child = self.child(name);
        child.path.push_str(&format!("[{}]", index));
        child
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: {}", file, self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// An unevaluated attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A plain value
    Literal(JsonValue),

    /// A string with one or more `${ ... }` segments
    Template(String),

    /// A list whose elements may contain templates
    List(Vec<Expression>),
}

impl Expression {
    fn from_yaml(value: &YamlValue) -> Result<Self> {
        Ok(match value {
            YamlValue::String(s) if s.contains("${") => Expression::Template(s.clone()),
            YamlValue::Sequence(items) => Expression::List(
                items
                    .iter()
                    .map(Expression::from_yaml)
                    .collect::<Result<Vec<_>>>()?,
            ),
            YamlValue::Tagged(tagged) => Expression::from_yaml(&tagged.value)?,
            other => Expression::Literal(serde_json::to_value(other)?),
        })
    }
}

/// A named attribute inside a body
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    pub range: SourceRef,
}

/// A nested block, e.g. `packet` or one `toleration` entry
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub body: Body,
    pub range: SourceRef,
}

/// Attributes and blocks of one configuration section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub attributes: IndexMap<String, Attribute>,
    pub blocks: Vec<Block>,
    pub range: SourceRef,
}

impl Body {
    /// An empty body at the given location
    pub fn empty(range: SourceRef) -> Self {
        Self {
            attributes: IndexMap::new(),
            blocks: Vec::new(),
            range,
        }
    }

    /// Build a body from a YAML mapping
    pub fn from_yaml(value: &YamlValue, range: SourceRef) -> Result<Self> {
        let mapping = match value {
            YamlValue::Mapping(mapping) => mapping,
            YamlValue::Tagged(tagged) => return Self::from_yaml(&tagged.value, range),
            _ => {
                return Err(CoreError::InvalidConfig {
                    file: range.file.clone().unwrap_or_default(),
                    message: format!("'{}' must be a mapping", range.path),
                });
            }
        };

        let mut body = Body::empty(range.clone());

        for (key, value) in mapping {
            let name = match key {
                YamlValue::String(s) => s.clone(),
                other => {
                    return Err(CoreError::InvalidConfig {
                        file: range.file.clone().unwrap_or_default(),
                        message: format!(
                            "keys under '{}' must be strings, found {:?}",
                            range.path, other
                        ),
                    });
                }
            };

            match value {
                YamlValue::Mapping(_) => {
                    let child = range.child(&name);
                    body.blocks.push(Block {
                        kind: name,
                        body: Body::from_yaml(value, child.clone())?,
                        range: child,
                    });
                }
                YamlValue::Sequence(items)
                    if !items.is_empty() && items.iter().all(YamlValue::is_mapping) =>
                {
                    for (index, item) in items.iter().enumerate() {
                        let child = range.indexed(&name, index);
                        body.blocks.push(Block {
                            kind: name.clone(),
                            body: Body::from_yaml(item, child.clone())?,
                            range: child,
                        });
                    }
                }
                _ => {
                    let attribute = Attribute {
                        name: name.clone(),
                        expr: Expression::from_yaml(value)?,
                        range: range.child(&name),
                    };
                    body.attributes.insert(name, attribute);
                }
            }
        }

        Ok(body)
    }

    /// Parse a body from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(yaml)?;
        match value {
            YamlValue::Null => Ok(Body::default()),
            value => Self::from_yaml(&value, SourceRef::default()),
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// All blocks of a kind, in source order
    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.blocks.is_empty()
    }
}
