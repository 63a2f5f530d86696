//! The evaluator (spec.md §4.G, component G).
//!
//! Recursive interpretation of a compiled AST against a variable
//! environment. No operator ever throws: division by zero yields ±∞,
//! `0/0` and `x%0` yield NaN, and the bitwise/shift family coerce through
//! [`integerise`] rather than panicking on out-of-range operands.

use crate::env::{Env, Number};
use crate::operator::{BinaryOp, UnaryOp};
use crate::span::Spanned;
use crate::tree::Node;

/// The NaN→0, ±∞→±`i32::MAX`, else-truncate coercion spec.md §4.G
/// requires before any bitwise/shift operator runs. Mirrors the classic
/// `x|0` idiom: operands round-trip through a 32-bit integer. Both bounds
/// clamp at `i32::MAX` (so negative overflow lands on `-i32::MAX`, one
/// above `i32::MIN`) rather than the full `i32` range.
fn integerise(n: Number) -> i32 {
    if n.is_nan() {
        0
    } else if n >= i32::MAX as Number {
        i32::MAX
    } else if n <= -(i32::MAX as Number) {
        -i32::MAX
    } else {
        n.trunc() as i32
    }
}

fn from_bool(b: bool) -> Number {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Evaluates a compiled AST root (or any subtree) against `env`.
pub fn eval(node: &Spanned<Node>, env: &Env) -> Number {
    match &node.item {
        Node::Const(value) => *value,
        Node::Var(id) => env.get(*id),
        Node::Unary(op, child) => eval_unary(*op, child, env),
        Node::Binary(op, left, right) => eval_binary(*op, left, right, env),
        Node::Func(call) => {
            let args: Vec<Number> = call.args.iter().map(|a| eval(a, env)).collect();
            let mut ctx = call.context.borrow_mut();
            (call.function.eval)(&args, &mut **ctx)
        }
    }
}

fn eval_unary(op: UnaryOp, child: &Spanned<Node>, env: &Env) -> Number {
    let v = eval(child, env);
    match op {
        UnaryOp::Neg => -v,
        // non-zero (including NaN, which compares unequal to everything) -> 0, zero -> 1.
        UnaryOp::LNot => from_bool(v == 0.0),
        UnaryOp::BNot => (!integerise(v)) as Number,
    }
}

fn eval_binary(op: BinaryOp, left: &Spanned<Node>, right: &Spanned<Node>, env: &Env) -> Number {
    use BinaryOp::*;
    match op {
        // Preserves the source's documented asymmetry (spec.md §9): the
        // left side is checked for zero but never for NaN, so a NaN left
        // operand still evaluates (and can surface through) the right
        // side instead of short-circuiting.
        And => {
            let l = eval(left, env);
            if l == 0.0 {
                0.0
            } else {
                let r = eval(right, env);
                if r != 0.0 {
                    r
                } else {
                    0.0
                }
            }
        }
        Or => {
            let l = eval(left, env);
            // Left excludes NaN from "truthy" (a NaN left operand falls
            // through to the right side). The right side has no such
            // exclusion: its own "non-zero" check is enough, so a NaN
            // right operand still returns NaN rather than 0.
            if l != 0.0 && !l.is_nan() {
                l
            } else {
                let r = eval(right, env);
                if r != 0.0 {
                    r
                } else {
                    0.0
                }
            }
        }
        Assign => {
            let v = eval(right, env);
            if let Node::Var(id) = &left.item {
                env.set(*id, v);
            }
            v
        }
        Comma => {
            eval(left, env);
            eval(right, env)
        }
        Add => eval(left, env) + eval(right, env),
        Sub => eval(left, env) - eval(right, env),
        Mul => eval(left, env) * eval(right, env),
        Div => eval(left, env) / eval(right, env),
        Rem => eval(left, env) % eval(right, env),
        Pow => eval(left, env).powf(eval(right, env)),
        Lt => from_bool(eval(left, env) < eval(right, env)),
        Le => from_bool(eval(left, env) <= eval(right, env)),
        Gt => from_bool(eval(left, env) > eval(right, env)),
        Ge => from_bool(eval(left, env) >= eval(right, env)),
        Eq => from_bool(eval(left, env) == eval(right, env)),
        Ne => from_bool(eval(left, env) != eval(right, env)),
        Shl => {
            let l = integerise(eval(left, env));
            let r = integerise(eval(right, env)) & 31;
            (l << r) as Number
        }
        Shr => {
            let l = integerise(eval(left, env));
            let r = integerise(eval(right, env)) & 31;
            (l >> r) as Number
        }
        BAnd => (integerise(eval(left, env)) & integerise(eval(right, env))) as Number,
        BOr => (integerise(eval(left, env)) | integerise(eval(right, env))) as Number,
        BXor => (integerise(eval(left, env)) ^ integerise(eval(right, env))) as Number,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::function::FunctionTable;
    use crate::parse::parse as parse_expr;

    fn run(text: &str) -> Number {
        let mut env = Env::new();
        let funcs = FunctionTable::new();
        let root = parse_expr(text, &mut env, &funcs).unwrap();
        eval(&root, &env)
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert_eq!(run("3/0"), Number::INFINITY);
        assert_eq!(run("(3/0)|0"), i32::MAX as Number);
    }

    #[test]
    fn remainder_by_zero_is_nan() {
        assert!(run("3%0").is_nan());
        assert_eq!(run("(3%0)|0"), 0.0);
    }

    #[test]
    fn nan_and_short_circuit() {
        assert!(run("1 && (3%0)").is_nan());
    }

    #[test]
    fn nan_or_short_circuit() {
        assert_eq!(run("1 || (3%0)"), 1.0);
    }

    #[test]
    fn nan_or_right_side_is_not_excluded() {
        assert!(run("0 || (3%0)").is_nan());
    }

    #[test]
    fn integerise_clamps_infinities() {
        assert_eq!(integerise(Number::INFINITY), i32::MAX);
        assert_eq!(integerise(Number::NEG_INFINITY), -i32::MAX);
        assert_eq!(integerise(Number::NAN), 0);
    }

    #[test]
    fn variable_round_trips_through_env() {
        let mut env = Env::new();
        let funcs = FunctionTable::new();
        let root = parse_expr("n = 7, n", &mut env, &funcs).unwrap();
        assert_eq!(eval(&root, &env), 7.0);
    }
}
