//! Predicate evaluator
//!
//! Walks the tree post-order, computing a value for every node and building
//! a trace entry for it. Binary operators always evaluate both operands so the
//! trace shows every branch, even when the left side already decides the
//! outcome.

use serde::{Deserialize, Serialize};

use super::ast::{ArithOp, CompareOp, LogicalOp, Node};
use super::context::EvaluationContext;
use super::parser::{self, DEFAULT_MAX_DEPTH};
use super::trace::TraceNode;
use super::value::Value;
use crate::error::EvalError;

/// Outcome of evaluating a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Final value coerced to a boolean; `false` whenever `error` is set
    pub pass: bool,
    /// Raw final value; `None` when evaluation failed
    #[serde(default)]
    pub value: Option<Value>,
    pub trace: TraceNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalResult {
    fn success(value: Value, trace: TraceNode) -> Self {
        Self {
            pass: value.is_truthy(),
            value: Some(value),
            trace,
            error: None,
        }
    }

    /// Result envelope for an evaluation that could not complete
    pub fn failure(err: &EvalError) -> Self {
        let message = err.to_string();
        Self {
            pass: false,
            value: None,
            trace: TraceNode::error(message.clone()),
            error: Some(message),
        }
    }

    fn parse_failure(text: &str, err: &EvalError) -> Self {
        Self {
            pass: false,
            value: None,
            trace: TraceNode::parse_error(text),
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Value and trace of one evaluated subtree
struct Evaluated {
    value: Value,
    trace: TraceNode,
}

/// Evaluate a predicate against a context. Never fails: errors are reported
/// through [`EvalResult::error`].
pub fn evaluate(node: &Node, ctx: &EvaluationContext) -> EvalResult {
    evaluate_with_limit(node, ctx, DEFAULT_MAX_DEPTH)
}

pub fn evaluate_with_limit(node: &Node, ctx: &EvaluationContext, max_depth: usize) -> EvalResult {
    match eval_node(node, ctx, 1, max_depth) {
        Ok(Evaluated { value, trace }) => {
            log::debug!("Evaluated predicate {} => {}", node, value);
            EvalResult::success(value, trace)
        }
        Err(err) => {
            log::warn!("Predicate evaluation failed ({}): {}", err.kind(), err);
            EvalResult::failure(&err)
        }
    }
}

/// Evaluate and hand back the typed error instead of a result envelope
pub fn try_evaluate(node: &Node, ctx: &EvaluationContext) -> Result<(Value, TraceNode), EvalError> {
    eval_node(node, ctx, 1, DEFAULT_MAX_DEPTH).map(|e| (e.value, e.trace))
}

/// Parse JSON text and evaluate it. Text that is not JSON yields an
/// "Invalid JSON" result whose trace carries the raw input.
pub fn evaluate_from_str(text: &str, ctx: &EvaluationContext) -> EvalResult {
    evaluate_from_str_with_limit(text, ctx, DEFAULT_MAX_DEPTH)
}

pub fn evaluate_from_str_with_limit(
    text: &str,
    ctx: &EvaluationContext,
    max_depth: usize,
) -> EvalResult {
    match parser::parse_with_limit(text, max_depth) {
        Ok(node) => evaluate_with_limit(&node, ctx, max_depth),
        Err(err @ EvalError::Parse(_)) => {
            log::warn!("Predicate is not valid JSON: {:?}", err);
            EvalResult::parse_failure(text, &err)
        }
        Err(err) => {
            log::warn!("Predicate rejected ({}): {}", err.kind(), err);
            EvalResult::failure(&err)
        }
    }
}

/// Evaluate an AST given as an already-parsed JSON document
pub fn evaluate_json(ast: &serde_json::Value, ctx: &EvaluationContext) -> EvalResult {
    match parser::from_json(ast) {
        Ok(node) => evaluate(&node, ctx),
        Err(err) => {
            log::warn!("Predicate rejected ({}): {}", err.kind(), err);
            EvalResult::failure(&err)
        }
    }
}

fn eval_node(
    node: &Node,
    ctx: &EvaluationContext,
    depth: usize,
    max_depth: usize,
) -> Result<Evaluated, EvalError> {
    if depth > max_depth {
        return Err(EvalError::DepthExceeded(max_depth));
    }
    let next = depth + 1;

    match node {
        Node::Const(value) => Ok(Evaluated {
            value: value.clone(),
            trace: TraceNode::leaf("const", value.clone()),
        }),
        Node::Field(name) => {
            let value = ctx
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::MissingField(name.clone()))?;
            Ok(Evaluated {
                trace: TraceNode::leaf(format!("field: {}", name), value.clone()),
                value,
            })
        }
        Node::Arithmetic { op, left, right } => {
            let l = eval_node(left, ctx, next, max_depth)?;
            let r = eval_node(right, ctx, next, max_depth)?;
            let result = Value::Number(apply_arithmetic(*op, &l.value, &r.value)?);
            Ok(Evaluated {
                trace: TraceNode::computed(
                    format!("{} (arithmetic)", op),
                    result.clone(),
                    vec![l.trace, r.trace],
                ),
                value: result,
            })
        }
        Node::Comparison { op, left, right } => {
            let l = eval_node(left, ctx, next, max_depth)?;
            let r = eval_node(right, ctx, next, max_depth)?;
            let pass = apply_comparison(*op, &l.value, &r.value)?;
            Ok(decision(
                format!("{} (comparison)", op),
                pass,
                vec![l.trace, r.trace],
            ))
        }
        Node::Logical { op, left, right } => {
            let l = eval_node(left, ctx, next, max_depth)?;
            let r = eval_node(right, ctx, next, max_depth)?;
            let pass = match op {
                LogicalOp::And => l.value.is_truthy() && r.value.is_truthy(),
                LogicalOp::Or => l.value.is_truthy() || r.value.is_truthy(),
            };
            Ok(decision(
                format!("{} (logical)", op),
                pass,
                vec![l.trace, r.trace],
            ))
        }
        Node::Not(inner) => {
            let i = eval_node(inner, ctx, next, max_depth)?;
            Ok(decision("not (logical)", !i.value.is_truthy(), vec![i.trace]))
        }
    }
}

fn decision(label: impl Into<String>, pass: bool, children: Vec<TraceNode>) -> Evaluated {
    Evaluated {
        value: Value::Bool(pass),
        trace: TraceNode::decision(label, pass, children),
    }
}

fn apply_arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<f64, EvalError> {
    let (a, b) = numbers(op.as_str(), left, right)?;
    Ok(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
    })
}

fn apply_comparison(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => Ok(left.strict_eq(right)),
        CompareOp::NotEq => Ok(!left.strict_eq(right)),
        CompareOp::Gt => compare_numbers(op, left, right, |a, b| a > b),
        CompareOp::Lt => compare_numbers(op, left, right, |a, b| a < b),
        CompareOp::Gte => compare_numbers(op, left, right, |a, b| a >= b),
        CompareOp::Lte => compare_numbers(op, left, right, |a, b| a <= b),
    }
}

fn compare_numbers<F>(op: CompareOp, left: &Value, right: &Value, cmp: F) -> Result<bool, EvalError>
where
    F: Fn(f64, f64) -> bool,
{
    let (a, b) = numbers(op.as_str(), left, right)?;
    Ok(cmp(a, b))
}

fn numbers(op: &str, left: &Value, right: &Value) -> Result<(f64, f64), EvalError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::TypeMismatch {
            op: op.to_string(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}
