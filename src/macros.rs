//! Parse-time macro table (spec.md §3 "Macro").
//!
//! A macro is a textual template named by `$(name, body...)` and
//! expanded by inlining a deep-cloned body with positional parameters.
//! The table that holds these only lives for the duration of one parse;
//! it never reaches the evaluator.

use std::collections::HashMap;

use crate::span::Spanned;
use crate::tree::Node;

/// `{ name, body }`: `body` is the vector of comma-separated argument
/// subtrees captured when `$(name, ...)` was parsed. The first body
/// element is always the defining `VAR` placeholder (spec.md §4.E); the
/// rest is the macro's expansion template.
pub struct Macro {
    pub name: String,
    pub body: Vec<Spanned<Node>>,
}

/// Owned by the `Parser` for the duration of a single `create` call.
#[derive(Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable::default()
    }

    pub fn define(&mut self, name: String, body: Vec<Spanned<Node>>) {
        self.macros.insert(name.clone(), Macro { name, body });
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }
}
