//! Scheduling blocks shared by components
//!
//! `toleration` and `node_affinity` blocks are decoded into Kubernetes
//! types so templates can emit them verbatim.

use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, Toleration,
};
use loko_core::{DecodedBody, Diagnostic, Diagnostics, FieldSpec, Schema};

pub const TOLERATION_OPERATORS: &[&str] = &["Exists", "Equal"];
pub const TOLERATION_EFFECTS: &[&str] = &["NoSchedule", "PreferNoSchedule", "NoExecute", ""];
pub const NODE_AFFINITY_OPERATORS: &[&str] = &["In", "NotIn", "Exists", "DoesNotExist", "Gt", "Lt"];

/// Schema of one `toleration` block
pub fn toleration_schema() -> Schema {
    Schema::new()
        .field(FieldSpec::string("key"))
        .field(FieldSpec::string("effect").one_of(TOLERATION_EFFECTS))
        .field(FieldSpec::string("operator").one_of(TOLERATION_OPERATORS))
        .field(FieldSpec::string("value"))
        .field(FieldSpec::integer("toleration_seconds"))
}

/// Schema of one `node_affinity` block
pub fn node_affinity_schema() -> Schema {
    Schema::new()
        .field(FieldSpec::string("key").required())
        .field(FieldSpec::string("operator").required().one_of(NODE_AFFINITY_OPERATORS))
        .field(FieldSpec::string_list("values"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Convert decoded `toleration` blocks
pub fn tolerations(blocks: &[DecodedBody]) -> Vec<Toleration> {
    blocks
        .iter()
        .map(|block| Toleration {
            key: non_empty(block.string("key")),
            effect: non_empty(block.string("effect")),
            operator: non_empty(block.string("operator")),
            value: non_empty(block.string("value")),
            toleration_seconds: block.integer("toleration_seconds"),
        })
        .collect()
}

/// Check the rules Kubernetes enforces on tolerations
///
/// A rule is skipped when a field it reads was rejected while decoding.
pub fn validate_tolerations(blocks: &[DecodedBody]) -> Diagnostics {
    let mut diags = Diagnostics::new();

    for block in blocks {
        let rejected = |fields: &[&str]| fields.iter().any(|f| block.is_rejected(f));
        let key = block.string("key").unwrap_or_default();
        let operator = block.string("operator").unwrap_or("Equal");
        let value = block.string("value").unwrap_or_default();

        if !rejected(&["operator", "value"]) && operator == "Exists" && !value.is_empty() {
            diags.push(
                Diagnostic::error(
                    "Invalid toleration",
                    "'value' must be empty when 'operator' is 'Exists'",
                )
                .with_subject(block.range().child("value")),
            );
        }
        if !rejected(&["key", "operator"]) && key.is_empty() && operator != "Exists" {
            diags.push(
                Diagnostic::error(
                    "Invalid toleration",
                    "'operator' must be 'Exists' when 'key' is empty",
                )
                .with_subject(block.range().child("operator")),
            );
        }
        if !rejected(&["effect"])
            && block.integer("toleration_seconds").is_some()
            && block.string("effect") != Some("NoExecute")
        {
            diags.push(
                Diagnostic::error(
                    "Invalid toleration",
                    "'toleration_seconds' can only be set when 'effect' is 'NoExecute'",
                )
                .with_subject(block.range().child("toleration_seconds")),
            );
        }
    }

    diags
}

/// Convert decoded `node_affinity` blocks
///
/// All rules land in a single required node selector term, so a node must
/// satisfy every one of them.
pub fn node_affinity(blocks: &[DecodedBody]) -> Option<Affinity> {
    if blocks.is_empty() {
        return None;
    }

    let requirements = blocks
        .iter()
        .map(|block| NodeSelectorRequirement {
            key: block.string("key").unwrap_or_default().to_string(),
            operator: block.string("operator").unwrap_or_default().to_string(),
            values: block
                .string_list("values")
                .filter(|values| !values.is_empty())
                .map(<[String]>::to_vec),
        })
        .collect();

    Some(Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: Some(requirements),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Check the value count each affinity operator expects
pub fn validate_node_affinity(blocks: &[DecodedBody]) -> Diagnostics {
    let mut diags = Diagnostics::new();

    for block in blocks {
        let Some(operator) = block.string("operator") else {
            continue;
        };
        let count = block.string_list("values").map_or(0, <[String]>::len);

        let problem = match operator {
            "In" | "NotIn" if count == 0 => Some(format!("'values' must not be empty when 'operator' is '{}'", operator)),
            "Exists" | "DoesNotExist" if count > 0 => Some(format!("'values' must be empty when 'operator' is '{}'", operator)),
            "Gt" | "Lt" if count != 1 => Some(format!("'values' must have exactly one element when 'operator' is '{}'", operator)),
            _ => None,
        };

        if let Some(detail) = problem {
            diags.push(
                Diagnostic::error("Invalid node affinity", detail)
                    .with_subject(block.range().child("values")),
            );
        }
    }

    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use loko_core::{Body, EvalContext, decode};
    use serde_json::json;

    fn decode_blocks(yaml: &str, kind: &'static str, schema: Schema) -> (Vec<DecodedBody>, Diagnostics) {
        let body = Body::from_yaml_str(yaml).unwrap();
        let outer = Schema::new().block(loko_core::BlockSpec::repeated(kind, schema));
        let (decoded, diags) = decode(&body, &outer, &EvalContext::new());
        (decoded.blocks(kind).to_vec(), diags)
    }

    #[test]
    fn test_tolerations_to_kubernetes() {
        let (blocks, diags) = decode_blocks(
            r#"
toleration:
  - key: node-role
    operator: Equal
    value: infra
    effect: NoSchedule
  - operator: Exists
"#,
            "toleration",
            toleration_schema(),
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert!(validate_tolerations(&blocks).is_empty());

        let json = serde_json::to_value(tolerations(&blocks)).unwrap();
        assert_eq!(
            json,
            json!([
                {"key": "node-role", "operator": "Equal", "value": "infra", "effect": "NoSchedule"},
                {"operator": "Exists"}
            ])
        );
    }

    #[test]
    fn test_toleration_operator_allow_list() {
        let (_, diags) = decode_blocks(
            "toleration:\n  - key: a\n    operator: Matches\n",
            "toleration",
            toleration_schema(),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.errors().next().unwrap().summary, "Unknown operator \"Matches\"");
    }

    #[test]
    fn test_rejected_field_is_reported_once() {
        let cases = [
            "toleration:\n  - operator: Matches\n",
            "toleration:\n  - key: a\n    effect: NoExec\n    toleration_seconds: 30\n",
        ];

        for yaml in cases {
            let (blocks, mut diags) = decode_blocks(yaml, "toleration", toleration_schema());
            diags.append(validate_tolerations(&blocks));
            assert_eq!(diags.len(), 1, "{}: {:?}", yaml, diags);
        }
    }

    #[test]
    fn test_toleration_empty_key_requires_exists() {
        let (blocks, diags) = decode_blocks(
            "toleration:\n  - operator: Equal\n    value: b\n",
            "toleration",
            toleration_schema(),
        );
        assert!(diags.is_empty());
        assert_eq!(validate_tolerations(&blocks).len(), 1);
    }

    #[test]
    fn test_toleration_exists_with_value() {
        let (blocks, _) = decode_blocks(
            "toleration:\n  - key: a\n    operator: Exists\n    value: b\n",
            "toleration",
            toleration_schema(),
        );
        assert_eq!(validate_tolerations(&blocks).len(), 1);
    }

    #[test]
    fn test_toleration_seconds_requires_no_execute() {
        let (blocks, _) = decode_blocks(
            "toleration:\n  - key: a\n    value: b\n    effect: NoSchedule\n    toleration_seconds: 30\n",
            "toleration",
            toleration_schema(),
        );
        assert_eq!(validate_tolerations(&blocks).len(), 1);
    }

    #[test]
    fn test_node_affinity_single_term() {
        let (blocks, diags) = decode_blocks(
            r#"
node_affinity:
  - key: node.kubernetes.io/role
    operator: In
    values: [ingress]
  - key: dedicated
    operator: Exists
"#,
            "node_affinity",
            node_affinity_schema(),
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert!(validate_node_affinity(&blocks).is_empty());

        let json = serde_json::to_value(node_affinity(&blocks)).unwrap();
        assert_eq!(
            json["nodeAffinity"]["requiredDuringSchedulingIgnoredDuringExecution"]["nodeSelectorTerms"],
            json!([{"matchExpressions": [
                {"key": "node.kubernetes.io/role", "operator": "In", "values": ["ingress"]},
                {"key": "dedicated", "operator": "Exists"}
            ]}])
        );
    }

    #[test]
    fn test_node_affinity_empty() {
        assert!(node_affinity(&[]).is_none());
    }

    #[test]
    fn test_node_affinity_value_counts() {
        let (blocks, _) = decode_blocks(
            r#"
node_affinity:
  - key: a
    operator: In
  - key: b
    operator: Exists
    values: [x]
  - key: c
    operator: Gt
    values: ["1", "2"]
"#,
            "node_affinity",
            node_affinity_schema(),
        );
        assert_eq!(validate_node_affinity(&blocks).len(), 3);
    }
}
