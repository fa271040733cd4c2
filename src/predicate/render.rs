// SPDX-License-Identifier: MIT

//! Human-readable rendering of predicates, e.g. `(invoice_amount > 10000)`

use std::fmt;

use super::ast::Node;
use super::value::Value;

/// Render a predicate as parenthesized infix text.
///
/// Purely structural: no context is consulted and rendering cannot fail.
/// The tree is walked with an explicit stack, so depth is not limited by
/// the call stack.
pub fn render(node: &Node) -> String {
    enum Step<'a> {
        Visit(&'a Node),
        Combine(&'a Node),
    }

    let mut steps = vec![Step::Visit(node)];
    let mut done: Vec<String> = Vec::new();
    while let Some(step) = steps.pop() {
        match step {
            Step::Visit(Node::Const(Value::String(s))) => done.push(format!("\"{}\"", s)),
            Step::Visit(Node::Const(value)) => done.push(value.to_string()),
            Step::Visit(Node::Field(name)) => done.push(name.clone()),
            Step::Visit(n) => {
                steps.push(Step::Combine(n));
                // Right pushed first so the left operand is rendered first
                steps.extend(n.children().into_iter().rev().map(Step::Visit));
            }
            Step::Combine(n) => {
                let right = done.pop().unwrap_or_default();
                let text = match n {
                    Node::Not(_) => format!("NOT {}", right),
                    Node::Arithmetic { op, .. } => {
                        let left = done.pop().unwrap_or_default();
                        format!("({} {} {})", left, op, right)
                    }
                    Node::Comparison { op, .. } => {
                        let left = done.pop().unwrap_or_default();
                        format!("({} {} {})", left, op.symbol(), right)
                    }
                    Node::Logical { op, .. } => {
                        let left = done.pop().unwrap_or_default();
                        format!("({} {} {})", left, op.as_str().to_uppercase(), right)
                    }
                    Node::Const(_) | Node::Field(_) => right,
                };
                done.push(text);
            }
        }
    }
    done.pop().unwrap_or_default()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
