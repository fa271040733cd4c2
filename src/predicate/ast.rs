// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for predicate expressions
//!
//! The grammar is closed: six node shapes, serialized as JSON objects with a
//! `type` discriminator. Unary `not` is its own variant so that a negation
//! carrying a second operand cannot be represented.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use super::parser;
use super::value::Value;

/// A predicate expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal value
    Const(Value),
    /// Lookup of a named value in the evaluation context
    Field(String),
    /// Numeric binary operation
    Arithmetic {
        op: ArithOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Comparison producing a boolean
    Comparison {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Binary boolean combinator
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Logical NOT
    Not(Box<Node>),
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// >
    Gt,
    /// <
    Lt,
    /// >=
    Gte,
    /// <=
    Lte,
    /// eq, strict equality
    Eq,
    /// ne, strict inequality
    NotEq,
}

/// Binary logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl ArithOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Gte),
            "<=" => Some(CompareOp::Lte),
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::NotEq),
            _ => None,
        }
    }

    /// Serialized operator name
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "eq",
            CompareOp::NotEq => "ne",
        }
    }

    /// Operator as shown to people in traces and rendered predicates
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "≠",
            other => other.as_str(),
        }
    }
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

impl std::fmt::Display for ArithOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Const(value.into())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Node::Field(name.into())
    }

    pub fn arithmetic(op: ArithOp, left: Node, right: Node) -> Self {
        Node::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comparison(op: CompareOp, left: Node, right: Node) -> Self {
        Node::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Node, right: Node) -> Self {
        Node::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(inner: Node) -> Self {
        Node::Not(Box::new(inner))
    }

    /// Direct operands, left before right
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Const(_) | Node::Field(_) => vec![],
            Node::Arithmetic { left, right, .. }
            | Node::Comparison { left, right, .. }
            | Node::Logical { left, right, .. } => vec![&**left, &**right],
            Node::Not(inner) => vec![&**inner],
        }
    }

    /// Number of levels in the tree; a single leaf has depth 1
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children().into_iter().map(|c| (c, depth + 1)));
        }
        max
    }

    /// Distinct field names referenced by the tree, in first-seen order
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Node::Field(name) = node {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
            // Reverse so the left operand is visited first
            stack.extend(node.children().into_iter().rev());
        }
        names
    }

    /// Serialize into the tagged JSON shape.
    ///
    /// Recursive: trees coming out of the parser are bounded by its depth
    /// limit, hand-built trees are not.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Const(value) => json!({ "type": "const", "value": value.to_json() }),
            Node::Field(name) => json!({ "type": "field", "name": name }),
            Node::Arithmetic { op, left, right } => {
                binary_json("arithmetic", op.as_str(), left, right)
            }
            Node::Comparison { op, left, right } => {
                binary_json("comparison", op.as_str(), left, right)
            }
            Node::Logical { op, left, right } => binary_json("logical", op.as_str(), left, right),
            Node::Not(inner) => json!({
                "type": "logical",
                "op": "not",
                "left": inner.to_json(),
            }),
        }
    }
}

fn binary_json(kind: &str, op: &str, left: &Node, right: &Node) -> serde_json::Value {
    json!({
        "type": kind,
        "op": op,
        "left": left.to_json(),
        "right": right.to_json(),
    })
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        parser::from_json(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_gate() -> Node {
        Node::comparison(
            CompareOp::Gt,
            Node::field("invoice_amount"),
            Node::constant(10000),
        )
    }

    #[test]
    fn test_compare_op_display() {
        assert_eq!(format!("{}", CompareOp::Eq), "=");
        assert_eq!(format!("{}", CompareOp::NotEq), "≠");
        assert_eq!(format!("{}", CompareOp::Gt), ">");
        assert_eq!(format!("{}", CompareOp::Gte), ">=");
        assert_eq!(format!("{}", CompareOp::Lt), "<");
        assert_eq!(format!("{}", CompareOp::Lte), "<=");
    }

    #[test]
    fn test_op_names_round_trip() {
        for op in ["+", "-", "*", "/"] {
            assert_eq!(ArithOp::parse(op).unwrap().as_str(), op);
        }
        for op in [">", "<", ">=", "<=", "eq", "ne"] {
            assert_eq!(CompareOp::parse(op).unwrap().as_str(), op);
        }
        assert_eq!(CompareOp::parse("=="), None);
        assert_eq!(ArithOp::parse("%"), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(Node::field("x").depth(), 1);
        assert_eq!(invoice_gate().depth(), 2);
        assert_eq!(Node::not(invoice_gate()).depth(), 3);
    }

    #[test]
    fn test_field_names_distinct_in_order() {
        let node = Node::and(
            Node::comparison(
                CompareOp::Gt,
                Node::field("order_value"),
                Node::field("credit_remaining"),
            ),
            Node::comparison(CompareOp::Lt, Node::field("order_value"), Node::constant(1)),
        );
        assert_eq!(node.field_names(), vec!["order_value", "credit_remaining"]);
    }

    #[test]
    fn test_to_json_shape() {
        assert_eq!(
            invoice_gate().to_json(),
            json!({
                "type": "comparison",
                "op": ">",
                "left": {"type": "field", "name": "invoice_amount"},
                "right": {"type": "const", "value": 10000}
            })
        );
        let not = Node::not(Node::field("x")).to_json();
        assert_eq!(not["op"], "not");
        assert!(not.get("right").is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let text = serde_json::to_string(&invoice_gate()).unwrap();
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, invoice_gate());
    }

    #[test]
    fn test_deserialize_rejects_unknown_type() {
        let result: Result<Node, _> = serde_json::from_str(r#"{"type": "regex", "value": "a"}"#);
        assert!(result.is_err());
    }
}
