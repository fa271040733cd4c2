// SPDX-License-Identifier: MIT

//! Machine-readable description of the predicate grammar.
//!
//! Handed to external producers of ASTs (e.g. a natural-language compiler)
//! so they stay inside the six node shapes the parser accepts.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// JSON Schema for a predicate AST node
pub static GRAMMAR_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Predicate AST node",
        "$defs": {
            "node": {
                "oneOf": [
                    {
                        "type": "object",
                        "properties": {
                            "type": { "const": "const" },
                            "value": { "type": ["number", "string", "boolean"] }
                        },
                        "required": ["type", "value"]
                    },
                    {
                        "type": "object",
                        "properties": {
                            "type": { "const": "field" },
                            "name": { "type": "string" }
                        },
                        "required": ["type", "name"]
                    },
                    binary("arithmetic", &["+", "-", "*", "/"]),
                    binary("comparison", &[">", "<", ">=", "<=", "eq", "ne"]),
                    binary("logical", &["and", "or"]),
                    {
                        "type": "object",
                        "properties": {
                            "type": { "const": "logical" },
                            "op": { "const": "not" },
                            "left": { "$ref": "#/$defs/node" }
                        },
                        "required": ["type", "op", "left"],
                        "not": { "required": ["right"] }
                    }
                ]
            }
        },
        "$ref": "#/$defs/node"
    })
});

fn binary(kind: &str, ops: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "const": kind },
            "op": { "enum": ops },
            "left": { "$ref": "#/$defs/node" },
            "right": { "$ref": "#/$defs/node" }
        },
        "required": ["type", "op", "left", "right"]
    })
}
