//! Expression evaluation for configuration templates
//!
//! Attribute values may embed `${ expr }` segments. Expressions use the
//! MiniJinja expression language and see every registered namespace, most
//! notably `var` for cluster-level variables.

use minijinja::{Environment, UndefinedBehavior, Value};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::ast::Expression;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unterminated template sequence in \"{input}\"")]
    Unterminated { input: String },

    #[error("failed to evaluate \"{expr}\": {message}")]
    Expression { expr: String, message: String },

    #[error("\"{expr}\" evaluated to an undefined value")]
    Undefined { expr: String },

    #[error("cannot interpolate {kind} value of \"{expr}\" into a string")]
    NotInterpolable { expr: String, kind: &'static str },
}

/// Variables and namespaces visible to configuration expressions
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    namespaces: BTreeMap<String, JsonValue>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context exposing `variables` under the `var` namespace
    pub fn with_variables(variables: JsonValue) -> Self {
        let mut ctx = Self::new();
        ctx.set_namespace("var", variables);
        ctx
    }

    /// Register or replace a namespace
    pub fn set_namespace(&mut self, name: impl Into<String>, value: JsonValue) {
        self.namespaces.insert(name.into(), value);
    }

    pub fn namespace(&self, name: &str) -> Option<&JsonValue> {
        self.namespaces.get(name)
    }

    /// Evaluate an attribute expression to a plain value
    pub fn evaluate(&self, expr: &Expression) -> Result<JsonValue, EvalError> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::List(items) => items
                .iter()
                .map(|item| self.evaluate(item))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            Expression::Template(template) => self.evaluate_template(template),
        }
    }

    fn evaluate_template(&self, template: &str) -> Result<JsonValue, EvalError> {
        let segments = split_template(template)?;

        // A lone `${ expr }` keeps the expression's type
        if let [Segment::Expr(expr)] = segments.as_slice() {
            return self.evaluate_expr(expr);
        }

        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(&text),
                Segment::Expr(expr) => match self.evaluate_expr(&expr)? {
                    JsonValue::String(s) => out.push_str(&s),
                    JsonValue::Number(n) => out.push_str(&n.to_string()),
                    JsonValue::Bool(b) => out.push_str(&b.to_string()),
                    JsonValue::Null => {
                        return Err(EvalError::NotInterpolable { expr, kind: "null" });
                    }
                    JsonValue::Array(_) => {
                        return Err(EvalError::NotInterpolable { expr, kind: "list" });
                    }
                    JsonValue::Object(_) => {
                        return Err(EvalError::NotInterpolable { expr, kind: "map" });
                    }
                },
            }
        }
        Ok(JsonValue::String(out))
    }

    fn evaluate_expr(&self, source: &str) -> Result<JsonValue, EvalError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let to_error = |err: minijinja::Error| EvalError::Expression {
            expr: source.to_string(),
            message: err.to_string(),
        };

        let compiled = env.compile_expression(source).map_err(to_error)?;
        let value = compiled
            .eval(Value::from_serialize(&self.namespaces))
            .map_err(to_error)?;

        if value.is_undefined() {
            return Err(EvalError::Undefined {
                expr: source.to_string(),
            });
        }

        serde_json::to_value(&value).map_err(|err| EvalError::Expression {
            expr: source.to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Expr(String),
}

/// Split a template string into literal text and `${ ... }` expressions
///
/// `$${` is an escaped literal `${`. Braces inside an expression are balanced
/// and quoted strings are skipped, so map literals and `"}"` work.
fn split_template(input: &str) -> Result<Vec<Segment>, EvalError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            // Escaped: keep one `$` and the `{`
            text.push_str(&rest[..pos]);
            text.push('{');
            rest = &rest[pos + 2..];
            continue;
        }

        text.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let end = find_closing_brace(after).ok_or_else(|| EvalError::Unterminated {
            input: input.to_string(),
        })?;

        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        segments.push(Segment::Expr(after[..end].trim().to_string()));
        rest = &after[end + 1..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn find_closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> EvalContext {
        EvalContext::with_variables(json!({
            "cluster_name": "demo",
            "workers": 3,
            "zones": ["ams1", "sjc1"],
        }))
    }

    #[test]
    fn test_literal_passthrough() {
        let value = ctx().evaluate(&Expression::Literal(json!(42))).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn test_lone_expression_keeps_type() {
        let ctx = ctx();
        assert_eq!(
            ctx.evaluate(&Expression::Template("${var.workers}".into())).unwrap(),
            json!(3)
        );
        assert_eq!(
            ctx.evaluate(&Expression::Template("${ var.zones }".into())).unwrap(),
            json!(["ams1", "sjc1"])
        );
    }

    #[test]
    fn test_interpolation() {
        let value = ctx()
            .evaluate(&Expression::Template("${var.cluster_name}-pool-${var.workers}".into()))
            .unwrap();
        assert_eq!(value, json!("demo-pool-3"));
    }

    #[test]
    fn test_expression_language() {
        let value = ctx()
            .evaluate(&Expression::Template("${ var.workers + 1 }".into()))
            .unwrap();
        assert_eq!(value, json!(4));
    }

    #[test]
    fn test_escape() {
        let value = ctx()
            .evaluate(&Expression::Template("cost: $${not_evaluated}".into()))
            .unwrap();
        assert_eq!(value, json!("cost: ${not_evaluated}"));
    }

    #[test]
    fn test_list_elements_are_evaluated() {
        let expr = Expression::List(vec![
            Expression::Template("${var.cluster_name}.example.com".into()),
            Expression::Literal(json!("static.example.com")),
        ]);
        assert_eq!(
            ctx().evaluate(&expr).unwrap(),
            json!(["demo.example.com", "static.example.com"])
        );
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let result = ctx().evaluate(&Expression::Template("${var.missing}".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_unterminated() {
        let result = ctx().evaluate(&Expression::Template("${var.cluster_name".into()));
        assert!(matches!(result, Err(EvalError::Unterminated { .. })));
    }

    #[test]
    fn test_list_cannot_be_interpolated() {
        let result = ctx().evaluate(&Expression::Template("zones: ${var.zones}".into()));
        assert!(matches!(
            result,
            Err(EvalError::NotInterpolable { kind: "list", .. })
        ));
    }

    #[test]
    fn test_split_template_balances_braces() {
        let segments = split_template("a${ {'x': '}'}['x'] }b").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("a".into()),
                Segment::Expr("{'x': '}'}['x']".into()),
                Segment::Text("b".into()),
            ]
        );
    }
}
