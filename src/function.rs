//! Host function descriptors (spec.md §3 "Function descriptor").
//!
//! The source's descriptor is `{ name, evaluator, cleanup?, ctx_size }`,
//! with `cleanup` invoked on a raw context buffer at node teardown. In
//! safe Rust the per-call context becomes a host-supplied `Box<dyn Any>`;
//! `cleanup` is then just `Drop` on that box, so it is not a field here
//! (see DESIGN.md for this open-question resolution). `ctx_size` is kept
//! as a documented compatibility field: it no longer sizes an allocation,
//! but a host can still use it to mean "this function wants a fresh
//! context" vs. "this function is stateless" without changing its `eval`
//! signature.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::env::Number;

/// A context a [`Function`] can stash state in across the lifetime of a
/// single call node. Fresh for every call site, and (per spec.md §9) for
/// every clone produced during macro expansion: a host function that
/// writes into its context will never see a previous call's writes show
/// up in a different clone.
pub trait Context: Any {
    fn as_any(&mut self) -> &mut dyn Any;
}

impl<T: Any> Context for T {
    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

/// Produces a fresh context for a call node that requested one
/// (`ctx_size > 0`). Most host functions are stateless and never need
/// this; it exists for the handful that want scratch space across the
/// arguments of one call.
pub type ContextFactory = fn() -> Box<dyn Context>;

/// A host-provided function. `eval` receives the already-evaluated
/// argument vector (never the raw AST) and a context buffer, which is an
/// empty `()` box when `ctx_size` is zero — host functions must tolerate
/// that null/zero-sized context exactly as spec.md §9 requires.
#[derive(Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub eval: fn(&[Number], &mut dyn Context) -> Number,
    pub ctx_size: usize,
    pub make_context: Option<ContextFactory>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("ctx_size", &self.ctx_size)
            .finish()
    }
}

impl Function {
    /// A stateless function: no context allocation, `ctx_size` stays 0.
    pub const fn stateless(name: &'static str, eval: fn(&[Number], &mut dyn Context) -> Number) -> Function {
        Function {
            name,
            eval,
            ctx_size: 0,
            make_context: None,
        }
    }

    pub fn make_context(&self) -> Box<dyn Context> {
        match self.make_context {
            Some(factory) if self.ctx_size > 0 => factory(),
            _ => Box::new(()),
        }
    }
}

/// The caller-owned table of host functions a compiled expression may
/// call by name. Looked up by name equality at parse time, exactly like
/// spec.md §3 describes; never mutated during evaluation.
#[derive(Debug, Default, Clone)]
pub struct FunctionTable {
    functions: HashMap<&'static str, Function>,
}

impl FunctionTable {
    pub fn new() -> FunctionTable {
        FunctionTable::default()
    }

    pub fn register(&mut self, function: Function) {
        self.functions.insert(function.name, function);
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn add(args: &[Number], _ctx: &mut dyn Context) -> Number {
        args.iter().sum()
    }

    #[test]
    fn register_and_lookup() {
        let mut table = FunctionTable::new();
        table.register(Function::stateless("add", add));
        let found = table.get("add").unwrap();
        assert_eq!((found.eval)(&[1.0, 2.0], &mut ()), 3.0);
    }

    #[test]
    fn stateless_context_is_unit() {
        let f = Function::stateless("add", add);
        let mut ctx = f.make_context();
        assert_eq!(ctx.as_any().downcast_mut::<()>(), Some(&mut ()));
    }
}
