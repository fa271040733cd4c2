// SPDX-License-Identifier: MIT

//! Stored rules: rule books, the shared registry, and intake of predicates
//! produced by the natural-language compiler.

pub mod intake;
pub mod loader;
pub mod registry;
pub mod types;

pub use intake::CompiledPredicate;
pub use loader::RuleBookLoader;
pub use registry::RuleRegistry;
pub use types::{
    FieldCatalog, FieldDef, FieldType, Rule, RuleBook, RuleKind, RuleOutcome, RuleSummary,
    Severity,
};
