//! # passerine-expr
//! A small embeddable arithmetic expression engine. Compile a textual
//! infix expression once into a reusable [`Expr`], then evaluate it
//! repeatedly against a caller-supplied [`Env`] and [`FunctionTable`].
//!
//! ## Embedding
//! ```
//! use passerine_expr::{create, eval, Env, FunctionTable};
//!
//! let mut env = Env::new();
//! let funcs = FunctionTable::new();
//! let expr = create("x = 5, y = 3, x + y", &mut env, &funcs).unwrap();
//! assert_eq!(eval(&expr, &env), 8.0);
//! ```
//!
//! ## Overview of the compilation pipeline
//! Source text is lexed by [`lex::lex`] into a flat, spanned token stream.
//! The lexer is *stateful*: a flags word tracks what kind of token is
//! legal next, so the same byte can mean different things depending on
//! what came before it (see `lex`'s module docs for the full rule set).
//!
//! [`parse`] consumes that stream with a shunting-yard variant: an output
//! stack of completed [`tree::Node`] subtrees, a pending-operator stack,
//! and a stack of in-progress call frames. Identifiers are looked one
//! token ahead to decide whether they start a call (to a host [`Function`]
//! or a previously defined macro) or resolve to a [`VarId`] in the
//! [`Env`]'s variable namespace. `$(name, body...)` defines a macro inline;
//! calling a defined macro later splices a deep-cloned copy of its body in
//! place, with positional parameters `$1, $2, ...` bound to the actuals.
//!
//! [`eval::eval`] then walks the resulting tree recursively against an
//! `Env`, with no operator ever panicking: out-of-domain results surface
//! as IEEE `NaN`/`±infinity` rather than errors.
//!
//! ## Errors and teardown
//! Anything that can fail does so at compile time, as `Result<_, Syntax>`
//! (see [`error::Syntax`]) rather than through an error-code out-parameter.
//! There's no explicit `destroy` call: an [`Expr`] and an [`Env`] release
//! everything they own when dropped, including per-call [`Function`]
//! contexts. [`destroy`] exists only so a caller translating call-for-call
//! from the engine this crate is modeled on has something to call.

pub mod env;
pub mod error;
pub mod eval;
pub mod function;
pub mod lex;
mod macros;
pub mod operator;
mod parse;
pub mod span;
pub mod tree;

pub use env::{Env, Number, VarId};
pub use error::{ErrorKind, Syntax};
pub use function::{Context, ContextFactory, Function, FunctionTable};
pub use span::{Span, Spanned};
pub use tree::Node;

use log::trace;

/// A compiled expression: an owned AST root, ready to be evaluated
/// repeatedly against the [`Env`] it was compiled with.
pub struct Expr {
    root: Spanned<Node>,
}

/// Compiles `text` into a reusable [`Expr`], resolving variable names
/// against `env` and call targets against `funcs` and `text`'s own
/// `$(...)` macro definitions.
pub fn create(text: &str, env: &mut Env, funcs: &FunctionTable) -> Result<Expr, Syntax> {
    trace!("compiling a {}-byte expression", text.len());
    let root = parse::parse(text, env, funcs)?;
    Ok(Expr { root })
}

/// Identical to [`create`]. Kept as a separate, named entry point for API
/// parity with engines that expose compilation and diagnostic inspection
/// as distinct calls; here the diagnostic (column + [`ErrorKind`]) is
/// simply carried by the `Err` variant of the shared `Result`.
pub fn create_with_diagnostics(
    text: &str,
    env: &mut Env,
    funcs: &FunctionTable,
) -> Result<Expr, Syntax> {
    create(text, env, funcs)
}

/// Evaluates a compiled expression against the [`Env`] it was compiled
/// with. Never fails; anomalous results surface as IEEE `NaN`/`±infinity`.
pub fn eval(expr: &Expr, env: &Env) -> Number {
    eval::eval(&expr.root, env)
}

/// Looks up or creates a variable by name; idempotent (spec.md §8).
pub fn var(env: &mut Env, name: &str) -> VarId {
    env.var(name)
}

/// No-op provided for callers translating call-for-call from an engine
/// that requires an explicit teardown call. `Expr` and `Env` free
/// everything they own on drop; this just drops them a little earlier.
pub fn destroy(expr: Option<Expr>, env: Option<Env>) {
    drop(expr);
    drop(env);
}

/// One-shot convenience: compiles and evaluates `text` against a fresh,
/// empty environment with no host functions. Returns `NaN` if `text`
/// fails to parse.
pub fn calc(text: &str) -> Number {
    calc_len(text, text.len())
}

/// Same as [`calc`], but only considers the first `len` bytes of `text`.
pub fn calc_len(text: &str, len: usize) -> Number {
    let len = len.min(text.len());
    let slice = match text.get(..len) {
        Some(s) => s,
        None => return Number::NAN,
    };
    let mut env = Env::new();
    let funcs = FunctionTable::new();
    match create(slice, &mut env, &funcs) {
        Ok(expr) => eval(&expr, &env),
        Err(_) => Number::NAN,
    }
}
