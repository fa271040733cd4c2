// SPDX-License-Identifier: MIT

//! Typed error handling for verdict-rs
//!
//! Evaluation failures (`EvalError`) never cross the evaluator boundary as
//! errors: the entry points fold them into an `EvalResult`. The remaining
//! types cover the rule book, compiler replies, contexts and the binary.

use thiserror::Error;

/// Top-level error type for verdict-rs
#[derive(Debug, Error)]
pub enum VerdictError {
    /// Rule book loading and validation errors
    #[error("Rule book error: {0}")]
    RuleBook(#[from] RuleBookError),

    /// Compiler reply rejected at intake
    #[error("Compiler reply rejected: {0}")]
    Intake(#[from] IntakeError),

    /// Context could not be built from the supplied data
    #[error("Invalid context: {0}")]
    Context(#[from] ContextError),

    /// Configuration errors (invalid env vars, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule not found in the rule book
    #[error("Rule '{id}' not found")]
    RuleNotFound { id: String },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Reasons a predicate evaluation could not complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Input text is not valid JSON; evaluation never started
    #[error("Invalid JSON")]
    Parse(String),

    /// Valid JSON, but not one of the six node shapes
    #[error("Malformed AST: {0}")]
    Grammar(String),

    /// A field node referenced a name absent from the context
    #[error("Field \"{0}\" not found in context")]
    MissingField(String),

    #[error("Division by zero")]
    DivisionByZero,

    /// Non-numeric operand to a numeric operator
    #[error("Type mismatch: '{op}' expects numbers, got {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    /// Tree nested deeper than the evaluation limit
    #[error("AST exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

impl EvalError {
    pub fn grammar(message: impl Into<String>) -> Self {
        Self::Grammar(message.into())
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Parse(_) => "parse",
            EvalError::Grammar(_) => "grammar",
            EvalError::MissingField(_) => "missing_field",
            EvalError::DivisionByZero => "division_by_zero",
            EvalError::TypeMismatch { .. } => "type_mismatch",
            EvalError::DepthExceeded(_) => "depth_exceeded",
        }
    }
}

/// Errors building an evaluation context
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context must be a JSON object")]
    NotAnObject,

    /// Only numbers, strings and booleans are allowed as field values
    #[error("field '{key}' has unsupported value type {found}")]
    UnsupportedValue { key: String, found: &'static str },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Rule book specific errors
#[derive(Debug, Error)]
pub enum RuleBookError {
    /// File not found when loading a rule book
    #[error("Rule book file not found: {0}")]
    FileNotFound(String),

    /// Two rules share an id
    #[error("Duplicate rule id: {0}")]
    DuplicateId(String),

    /// Rule references a field missing from the field catalog
    #[error("Rule '{rule}' references unknown field '{field}'")]
    UnknownField { rule: String, field: String },

    /// Rule AST nested deeper than the configured limit
    #[error("Rule '{rule}' exceeds maximum depth of {max_depth}")]
    TooDeep { rule: String, max_depth: usize },

    /// Catalog example does not have the field's declared type
    #[error("Field '{field}' is declared {expected} but its example is a {found}")]
    ExampleType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// File exists but could not be read
    #[error("Failed to read rule book: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors validating a reply from the natural-language compiler
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Reply was not JSON at all; carries a prefix of the reply
    #[error("compiler returned non-JSON: {0}")]
    NotJson(String),

    /// Compiler declined to produce an AST
    #[error("{0}")]
    Rejected(String),

    #[error("reply has no 'ast' field")]
    MissingAst,

    #[error("{0}")]
    Grammar(EvalError),

    #[error("Unknown field: {0}")]
    UnknownField(String),
}

impl VerdictError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a rule not found error
    pub fn rule_not_found(id: impl Into<String>) -> Self {
        Self::RuleNotFound { id: id.into() }
    }
}
