// SPDX-License-Identifier: MIT

//! Evaluation context: the named values `field` nodes resolve against

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::value::Value;
use crate::error::ContextError;

/// Flat mapping from field name to a scalar value.
///
/// Supplied fresh for each evaluation; the evaluator only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    fields: HashMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object of scalar values
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ContextError> {
        let obj = value.as_object().ok_or(ContextError::NotAnObject)?;
        let mut fields = HashMap::with_capacity(obj.len());
        for (key, raw) in obj {
            let value = Value::from_json(raw).ok_or_else(|| ContextError::UnsupportedValue {
                key: key.clone(),
                found: match raw {
                    serde_json::Value::Null => "null",
                    serde_json::Value::Array(_) => "array",
                    _ => "object",
                },
            })?;
            fields.insert(key.clone(), value);
        }
        Ok(Self { fields })
    }

    pub fn from_json_str(text: &str) -> Result<Self, ContextError> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&raw)
    }

    /// Set a field, returning `self` for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert context to JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EvaluationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
