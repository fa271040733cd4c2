// SPDX-License-Identifier: MIT

//! verdict-rs: evaluate JSON predicate ASTs against flat records and explain
//! every decision with a trace tree.

pub mod config;
pub mod error;
pub mod predicate;
pub mod rules;
pub mod server;
