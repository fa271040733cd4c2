// SPDX-License-Identifier: MIT

//! Schema types for rule book documents
//!
//! A rule book names stored predicates (business rules, skill activation
//! conditions, constraints) and optionally whitelists the fields they may
//! reference.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::RuleBookError;
use crate::predicate::{self, EvalResult, EvaluationContext, Node, Value, DEFAULT_MAX_DEPTH};

/// Top-level rule book document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleBook {
    /// Fields rules may reference; empty means unrestricted
    #[serde(default)]
    pub fields: FieldCatalog,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Whitelist of context fields with their types and example values
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FieldCatalog {
    pub fields: Vec<FieldDef>,
}

/// A whitelisted field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Example value, used to build sample contexts
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
}

/// A stored, named predicate
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Rule {
    /// Unique identifier, e.g. `high_value_invoice_approval_gate`
    pub id: String,
    /// Display name; falls back to the id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: RuleKind,
    #[serde(default)]
    pub severity: Severity,
    /// Reported when the predicate passes
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub ast: Node,
}

fn default_active() -> bool {
    true
}

/// What a stored predicate is used for
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Business rule / SOP (default)
    #[default]
    Rule,
    /// Activation condition of an agent skill
    Skill,
    /// Constraint guarding writes to a record
    Constraint,
}

/// How seriously a triggered rule should be taken
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warn,
    Block,
}

/// Result of checking one rule against a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub severity: Severity,
    /// The predicate evaluated to true
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub result: EvalResult,
}

/// Compact listing entry for a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSummary {
    pub id: String,
    pub name: String,
    pub kind: RuleKind,
    pub severity: Severity,
    pub active: bool,
    pub rendered: String,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Number, Value::Number(_))
                | (FieldType::String, Value::String(_))
                | (FieldType::Boolean, Value::Bool(_))
        )
    }
}

impl FieldCatalog {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Context filled with each field's example value
    pub fn sample_context(&self) -> EvaluationContext {
        self.fields
            .iter()
            .filter_map(|f| f.example.clone().map(|v| (f.name.clone(), v)))
            .collect()
    }

    /// First field referenced by `node` that the catalog does not list.
    /// An empty catalog allows everything.
    pub fn first_unknown<'a>(&self, node: &'a Node) -> Option<&'a str> {
        if self.is_empty() {
            return None;
        }
        node.field_names()
            .into_iter()
            .find(|name| !self.contains(name))
    }
}

impl Rule {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        self.evaluate_with_limit(ctx, DEFAULT_MAX_DEPTH)
    }

    pub fn evaluate_with_limit(&self, ctx: &EvaluationContext, max_depth: usize) -> EvalResult {
        predicate::evaluate_with_limit(&self.ast, ctx, max_depth)
    }

    /// Evaluate and wrap the result with this rule's metadata
    pub fn check(&self, ctx: &EvaluationContext) -> RuleOutcome {
        self.check_with_limit(ctx, DEFAULT_MAX_DEPTH)
    }

    pub fn check_with_limit(&self, ctx: &EvaluationContext, max_depth: usize) -> RuleOutcome {
        let result = self.evaluate_with_limit(ctx, max_depth);
        let triggered = result.pass;
        RuleOutcome {
            rule_id: self.id.clone(),
            severity: self.severity,
            triggered,
            message: if triggered { self.message.clone() } else { None },
            result,
        }
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            id: self.id.clone(),
            name: self.display_name().to_string(),
            kind: self.kind,
            severity: self.severity,
            active: self.active,
            rendered: predicate::render(&self.ast),
        }
    }
}

impl RuleBook {
    /// Check catalog examples match their declared types, ids are unique,
    /// and rules stay within the field catalog
    pub fn validate(&self) -> Result<(), RuleBookError> {
        self.validate_with_limit(DEFAULT_MAX_DEPTH)
    }

    /// [`RuleBook::validate`], also rejecting rules nested deeper than `max_depth`
    pub fn validate_with_limit(&self, max_depth: usize) -> Result<(), RuleBookError> {
        for field in &self.fields.fields {
            if let Some(example) = &field.example {
                if !field.field_type.accepts(example) {
                    return Err(RuleBookError::ExampleType {
                        field: field.name.clone(),
                        expected: field.field_type.as_str(),
                        found: example.type_name(),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleBookError::DuplicateId(rule.id.clone()));
            }
            if rule.ast.depth() > max_depth {
                return Err(RuleBookError::TooDeep {
                    rule: rule.id.clone(),
                    max_depth,
                });
            }
            if let Some(field) = self.fields.first_unknown(&rule.ast) {
                return Err(RuleBookError::UnknownField {
                    rule: rule.id.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.active)
    }

    /// Evaluate every active rule against a record
    pub fn check(&self, ctx: &EvaluationContext) -> Vec<RuleOutcome> {
        self.active().map(|rule| rule.check(ctx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::CompareOp;

    fn gate(id: &str, field: &str, limit: i64) -> Rule {
        Rule {
            id: id.to_string(),
            name: None,
            description: String::new(),
            kind: RuleKind::Constraint,
            severity: Severity::Block,
            message: Some(format!("{} over {}", field, limit)),
            active: true,
            ast: Node::comparison(CompareOp::Gt, Node::field(field), Node::constant(limit)),
        }
    }

    fn catalog() -> FieldCatalog {
        FieldCatalog {
            fields: vec![
                FieldDef {
                    name: "invoice_amount".into(),
                    field_type: FieldType::Number,
                    example: Some(Value::from(12000)),
                    description: None,
                },
                FieldDef {
                    name: "customer_tier".into(),
                    field_type: FieldType::String,
                    example: Some(Value::from("gold")),
                    description: None,
                },
                FieldDef {
                    name: "quantity".into(),
                    field_type: FieldType::Number,
                    example: None,
                    description: None,
                },
            ],
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(RuleKind::default(), RuleKind::Rule);
        assert_eq!(Severity::default(), Severity::Warn);
        assert!(Severity::Block > Severity::Info);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut rule = gate("gate", "invoice_amount", 10000);
        assert_eq!(rule.display_name(), "gate");
        rule.name = Some("Invoice Gate".into());
        assert_eq!(rule.display_name(), "Invoice Gate");
    }

    #[test]
    fn test_sample_context_skips_fields_without_example() {
        let ctx = catalog().sample_context();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("invoice_amount"), Some(&Value::from(12000)));
        assert!(!ctx.contains("quantity"));
    }

    #[test]
    fn test_first_unknown() {
        let rule = gate("g", "order_value", 5);
        assert_eq!(catalog().first_unknown(&rule.ast), Some("order_value"));
        assert_eq!(FieldCatalog::default().first_unknown(&rule.ast), None);
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let book = RuleBook {
            fields: FieldCatalog::default(),
            rules: vec![gate("a", "x", 1), gate("a", "y", 2)],
        };
        assert!(matches!(
            book.validate(),
            Err(RuleBookError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_validate_unknown_field() {
        let book = RuleBook {
            fields: catalog(),
            rules: vec![gate("ok", "invoice_amount", 1), gate("bad", "margin", 2)],
        };
        match book.validate() {
            Err(RuleBookError::UnknownField { rule, field }) => {
                assert_eq!(rule, "bad");
                assert_eq!(field, "margin");
            }
            other => panic!("Expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_check_reports_triggered_active_rules() {
        let mut inactive = gate("off", "invoice_amount", 0);
        inactive.active = false;
        let book = RuleBook {
            fields: catalog(),
            rules: vec![
                gate("high", "invoice_amount", 10000),
                gate("very_high", "invoice_amount", 50000),
                inactive,
            ],
        };
        let ctx = EvaluationContext::new().with("invoice_amount", 12000);
        let outcomes = book.check(&ctx);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].triggered);
        assert_eq!(
            outcomes[0].message.as_deref(),
            Some("invoice_amount over 10000")
        );
        assert!(!outcomes[1].triggered);
        assert_eq!(outcomes[1].message, None);
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Number.accepts(&Value::from(1.5)));
        assert!(FieldType::Boolean.accepts(&Value::from(false)));
        assert!(!FieldType::String.accepts(&Value::from(7)));
    }

    #[test]
    fn test_validate_with_limit() {
        let book = RuleBook {
            fields: catalog(),
            rules: vec![gate("g", "invoice_amount", 1)],
        };
        assert!(book.validate_with_limit(2).is_ok());
        assert!(matches!(
            book.validate_with_limit(1),
            Err(RuleBookError::TooDeep { max_depth: 1, .. })
        ));
    }

    #[test]
    fn test_evaluate_with_limit() {
        let rule = gate("g", "invoice_amount", 1);
        let ctx = EvaluationContext::new().with("invoice_amount", 5);
        assert!(rule.evaluate_with_limit(&ctx, 2).pass);
        let outcome = rule.check_with_limit(&ctx, 1);
        assert!(!outcome.triggered);
        assert_eq!(
            outcome.result.error.as_deref(),
            Some("AST exceeds maximum depth of 1")
        );
    }

    #[test]
    fn test_check_missing_field_does_not_trigger() {
        let rule = gate("g", "invoice_amount", 1);
        let outcome = rule.check(&EvaluationContext::new());
        assert!(!outcome.triggered);
        assert!(outcome.result.is_error());
    }

    #[test]
    fn test_summary_renders_predicate() {
        let summary = gate("g", "invoice_amount", 10000).summary();
        assert_eq!(summary.rendered, "(invoice_amount > 10000)");
        assert_eq!(summary.kind, RuleKind::Constraint);
    }
}
