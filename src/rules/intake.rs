// SPDX-License-Identifier: MIT

//! Intake of replies from the natural-language predicate compiler
//!
//! The compiler is expected to answer with bare JSON, either
//! `{"ast": <node>, "summary": "..."}` or `{"error": "..."}`. Replies are
//! treated as untrusted: stray code fences are removed, the AST must fit the
//! grammar, and optionally every field must be whitelisted.

use serde::Serialize;

use super::types::FieldCatalog;
use crate::error::IntakeError;
use crate::predicate::{self, Node, DEFAULT_MAX_DEPTH};

/// Number of characters of a non-JSON reply kept in the error
const REPLY_PREVIEW_CHARS: usize = 200;

/// A validated predicate produced by the compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPredicate {
    pub ast: Node,
    pub summary: String,
}

impl CompiledPredicate {
    /// Validate a raw compiler reply
    pub fn parse(raw: &str) -> Result<Self, IntakeError> {
        Self::parse_with_limit(raw, DEFAULT_MAX_DEPTH)
    }

    pub fn parse_with_limit(raw: &str, max_depth: usize) -> Result<Self, IntakeError> {
        let cleaned = strip_fences(raw);
        let reply: serde_json::Value = serde_json::from_str(&cleaned).map_err(|_| {
            IntakeError::NotJson(cleaned.chars().take(REPLY_PREVIEW_CHARS).collect())
        })?;

        if let Some(message) = reply.get("error").and_then(|e| e.as_str()) {
            if !message.is_empty() {
                log::warn!("Compiler declined: {}", message);
                return Err(IntakeError::Rejected(message.to_string()));
            }
        }

        let ast = reply.get("ast").ok_or(IntakeError::MissingAst)?;
        let ast = predicate::from_json_with_limit(ast, max_depth).map_err(|e| {
            log::warn!("Compiler produced a malformed AST: {}", e);
            IntakeError::Grammar(e)
        })?;
        let summary = reply
            .get("summary")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self { ast, summary })
    }

    /// Reject predicates that reference fields outside the catalog
    pub fn check_fields(&self, catalog: &FieldCatalog) -> Result<(), IntakeError> {
        match catalog.first_unknown(&self.ast) {
            Some(field) => Err(IntakeError::UnknownField(format!(
                "{}. Available fields: {}",
                field,
                catalog.names().join(", ")
            ))),
            None => Ok(()),
        }
    }

    pub fn rendered(&self) -> String {
        predicate::render(&self.ast)
    }
}

/// Remove markdown code fences (```` ``` ```` and ```` ```json ````)
fn strip_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        // Language tag and the newline after it
        rest = rest.trim_start_matches(|c: char| c.is_ascii_lowercase());
        rest = rest.strip_prefix('\n').unwrap_or(rest);
    }
    out.push_str(rest);
    out.trim().to_string()
}
