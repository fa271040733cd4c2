// SPDX-License-Identifier: MIT

//! Evaluation trace: a tree mirroring the AST, one entry per visited node

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Record of a single evaluated node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNode {
    /// Human-readable description, e.g. `field: invoice_amount`
    pub label: String,
    /// Value computed at this node
    pub value: Value,
    /// Outcome of boolean-producing nodes (comparison, logical)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<bool>,
    /// Operand traces, left before right
    #[serde(default)]
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    pub fn leaf(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
            pass: None,
            children: vec![],
        }
    }

    /// Trace for a node that computed a number from its operands
    pub fn computed(label: impl Into<String>, value: Value, children: Vec<TraceNode>) -> Self {
        Self {
            label: label.into(),
            value,
            pass: None,
            children,
        }
    }

    /// Trace for a boolean-producing node; `value` mirrors `pass`
    pub fn decision(label: impl Into<String>, pass: bool, children: Vec<TraceNode>) -> Self {
        Self {
            label: label.into(),
            value: Value::Bool(pass),
            pass: Some(pass),
            children,
        }
    }

    /// Minimal trace standing in for an aborted evaluation
    pub fn error(message: impl Into<String>) -> Self {
        Self::leaf("error", Value::String(message.into()))
    }

    /// Trace for input that could not be parsed; carries the raw text
    pub fn parse_error(text: impl Into<String>) -> Self {
        Self::leaf("parse error", Value::String(text.into()))
    }

    /// Total number of entries in this trace
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Indented text rendering for terminals, one line per entry
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let marker = match node.pass {
                Some(true) => "✓ ",
                Some(false) => "✗ ",
                None => "",
            };
            let value = match &node.value {
                Value::String(s) => format!("\"{}\"", s),
                other => other.to_string(),
            };
            out.push_str(&format!(
                "{}{}{} → {}\n",
                "  ".repeat(depth),
                marker,
                node.label,
                value
            ));
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }
}
