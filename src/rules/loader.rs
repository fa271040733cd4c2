//! Rule book loader - YAML/JSON file loading and parsing

use super::types::RuleBook;
use crate::error::RuleBookError;
use crate::predicate::DEFAULT_MAX_DEPTH;
use std::fs;
use std::path::Path;

/// Loads rule books from YAML or JSON files
pub struct RuleBookLoader {
    max_depth: usize,
}

impl RuleBookLoader {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Reject rules nested deeper than `max_depth` when loading files.
    /// Embedded ASTs are always parsed with the default bound first.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Load and validate a rule book; `.json` files are read as JSON,
    /// anything else as YAML
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<RuleBook, RuleBookError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RuleBookError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let book = if is_json {
            Self::parse_json(&content)?
        } else {
            Self::parse_yaml(&content)?
        };
        book.validate_with_limit(self.max_depth)?;
        log::info!(
            "Loaded {} rules ({} fields) from {}",
            book.rules.len(),
            book.fields.fields.len(),
            path.display()
        );
        Ok(book)
    }

    /// Parse and validate a rule book from a YAML string
    pub fn parse_yaml(content: &str) -> Result<RuleBook, RuleBookError> {
        let book: RuleBook = serde_yaml::from_str(content)?;
        book.validate()?;
        Ok(book)
    }

    /// Parse and validate a rule book from a JSON string
    pub fn parse_json(content: &str) -> Result<RuleBook, RuleBookError> {
        let book: RuleBook = serde_json::from_str(content)?;
        book.validate()?;
        Ok(book)
    }
}

impl Default for RuleBookLoader {
    fn default() -> Self {
        Self::new()
    }
}
