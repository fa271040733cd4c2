//! Predicate AST parser
//!
//! Turns JSON into a typed [`Node`] tree, rejecting anything outside the
//! closed grammar:
//! - `{"type":"const","value":10000}`
//! - `{"type":"field","name":"invoice_amount"}`
//! - `{"type":"comparison","op":">","left":{..},"right":{..}}`
//!
//! ASTs may come from an external language-model compiler, so every shape
//! is checked and nesting is bounded.

use serde_json::error::Category;
use serde_json::{Map, Value as Json};

use super::ast::{ArithOp, CompareOp, LogicalOp, Node};
use super::value::Value;
use crate::error::EvalError;

/// Default bound on tree depth, shared by the parser and the evaluator
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parse JSON text into an AST.
///
/// Text that is not JSON is an [`EvalError::Parse`]; well-formed JSON outside
/// the grammar is an [`EvalError::Grammar`].
pub fn parse(input: &str) -> Result<Node, EvalError> {
    parse_with_limit(input, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_limit(input: &str, max_depth: usize) -> Result<Node, EvalError> {
    let raw: Json = serde_json::from_str(input).map_err(|e| json_error(e, max_depth))?;
    from_json_with_limit(&raw, max_depth)
}

/// serde_json gives up on deeply nested input before the grammar sees it;
/// that is still a depth violation, not unreadable text
fn json_error(err: serde_json::Error, max_depth: usize) -> EvalError {
    if err.classify() == Category::Syntax
        && err.to_string().starts_with("recursion limit exceeded")
    {
        depth_exceeded(max_depth)
    } else {
        EvalError::Parse(err.to_string())
    }
}

fn depth_exceeded(max_depth: usize) -> EvalError {
    EvalError::grammar(format!("AST exceeds maximum depth of {}", max_depth))
}

/// Convert an already-parsed JSON document into an AST
pub fn from_json(value: &Json) -> Result<Node, EvalError> {
    from_json_with_limit(value, DEFAULT_MAX_DEPTH)
}

pub fn from_json_with_limit(value: &Json, max_depth: usize) -> Result<Node, EvalError> {
    convert(value, 1, max_depth)
}

fn convert(value: &Json, depth: usize, max_depth: usize) -> Result<Node, EvalError> {
    if depth > max_depth {
        return Err(depth_exceeded(max_depth));
    }

    let obj = value.as_object().ok_or_else(|| {
        EvalError::grammar(format!("expected a node object, found {}", json_type(value)))
    })?;

    let kind = obj
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| EvalError::grammar("node is missing a string \"type\""))?;

    match kind {
        "const" => {
            let literal = obj
                .get("value")
                .and_then(Value::from_json)
                .ok_or_else(|| {
                    EvalError::grammar("const value must be a number, string or boolean")
                })?;
            Ok(Node::Const(literal))
        }
        "field" => {
            let name = obj
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| EvalError::grammar("field node requires a string \"name\""))?;
            Ok(Node::Field(name.to_string()))
        }
        "arithmetic" => {
            let op = op_str(obj, kind)?;
            let op = ArithOp::parse(op).ok_or_else(|| unknown_op(kind, op))?;
            let (left, right) = operands(obj, kind, depth, max_depth)?;
            Ok(Node::arithmetic(op, left, right))
        }
        "comparison" => {
            let op = op_str(obj, kind)?;
            let op = CompareOp::parse(op).ok_or_else(|| unknown_op(kind, op))?;
            let (left, right) = operands(obj, kind, depth, max_depth)?;
            Ok(Node::comparison(op, left, right))
        }
        "logical" => match op_str(obj, kind)? {
            "not" => {
                if obj.contains_key("right") {
                    return Err(EvalError::grammar(
                        "\"not\" takes a single operand but \"right\" is present",
                    ));
                }
                let inner = operand(obj, "left", kind, depth, max_depth)?;
                Ok(Node::not(inner))
            }
            op @ ("and" | "or") => {
                let (left, right) = operands(obj, kind, depth, max_depth)?;
                Ok(Node::Logical {
                    op: if op == "and" {
                        LogicalOp::And
                    } else {
                        LogicalOp::Or
                    },
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            other => Err(unknown_op(kind, other)),
        },
        other => Err(EvalError::grammar(format!(
            "unknown node type \"{}\"",
            other
        ))),
    }
}

fn op_str<'a>(obj: &'a Map<String, Json>, kind: &str) -> Result<&'a str, EvalError> {
    obj.get("op")
        .and_then(Json::as_str)
        .ok_or_else(|| EvalError::grammar(format!("{} node requires a string \"op\"", kind)))
}

fn unknown_op(kind: &str, op: &str) -> EvalError {
    EvalError::grammar(format!("unknown {} operator \"{}\"", kind, op))
}

fn operands(
    obj: &Map<String, Json>,
    kind: &str,
    depth: usize,
    max_depth: usize,
) -> Result<(Node, Node), EvalError> {
    let left = operand(obj, "left", kind, depth, max_depth)?;
    let right = operand(obj, "right", kind, depth, max_depth)?;
    Ok((left, right))
}

fn operand(
    obj: &Map<String, Json>,
    key: &str,
    kind: &str,
    depth: usize,
    max_depth: usize,
) -> Result<Node, EvalError> {
    let child = obj
        .get(key)
        .ok_or_else(|| EvalError::grammar(format!("{} node is missing \"{}\"", kind, key)))?;
    convert(child, depth + 1, max_depth)
}

fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
