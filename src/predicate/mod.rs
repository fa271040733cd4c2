// SPDX-License-Identifier: MIT

//! Predicate parsing, evaluation and rendering
//!
//! Predicates are JSON ASTs such as:
//! - `{"type":"comparison","op":">","left":{"type":"field","name":"invoice_amount"},"right":{"type":"const","value":10000}}`
//!
//! Evaluating one against an [`EvaluationContext`] yields an [`EvalResult`]
//! carrying the decision and a [`TraceNode`] tree explaining it.

mod ast;
mod context;
mod evaluator;
mod grammar;
mod parser;
mod render;
mod trace;
mod value;

pub use ast::{ArithOp, CompareOp, LogicalOp, Node};
pub use context::EvaluationContext;
pub use evaluator::{
    evaluate, evaluate_from_str, evaluate_from_str_with_limit, evaluate_json, evaluate_with_limit,
    try_evaluate, EvalResult,
};
pub use grammar::GRAMMAR_SCHEMA;
pub use parser::{from_json, from_json_with_limit, parse, parse_with_limit, DEFAULT_MAX_DEPTH};
pub use render::render;
pub use trace::TraceNode;
pub use value::Value;
