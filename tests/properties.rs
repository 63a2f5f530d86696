//! Property tests for the invariants spec.md §8 calls out explicitly:
//! idempotent variable lookup, and operator precedence holding for
//! arbitrary operand values rather than just the literal worked examples.

use passerine_expr::{calc, var, Env};
use proptest::prelude::*;

fn ident_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,7}"
}

proptest! {
    /// spec.md §8: "for all variable names n, var(E, n) is idempotent."
    #[test]
    fn var_lookup_is_idempotent(name in ident_strategy()) {
        let mut env = Env::new();
        let a = var(&mut env, &name);
        let b = var(&mut env, &name);
        prop_assert_eq!(a, b);
        prop_assert_eq!(env.len(), 1);
    }

    /// Distinct names never collide, regardless of how many other
    /// variables already exist in the environment.
    #[test]
    fn distinct_names_get_distinct_ids(names in prop::collection::vec(ident_strategy(), 1..8)) {
        let mut env = Env::new();
        let mut seen = std::collections::HashMap::new();
        for name in &names {
            let id = var(&mut env, name);
            seen.entry(name.clone()).or_insert(id);
            prop_assert_eq!(seen[name], id);
        }
    }

    /// spec.md §4.C: `*`/`/` bind tighter than `+`/`-` for any operands,
    /// not just the literal `2+3*4` example.
    #[test]
    fn multiplication_binds_tighter_than_addition(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6, c in -1.0e6f64..1.0e6) {
        let text = format!("{a} + {b} * {c}");
        let expected = a + (b * c);
        let actual = calc(&text);
        prop_assert!((actual - expected).abs() <= expected.abs() * 1e-9 + 1e-9);
    }

    /// spec.md §8: `var(E, n).value = v; eval("n") == v` round-trip, for
    /// arbitrary finite values.
    #[test]
    fn variable_value_round_trips(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let mut env = Env::new();
        let id = var(&mut env, "n");
        env.set(id, v);
        let funcs = passerine_expr::FunctionTable::new();
        let expr = passerine_expr::create("n", &mut env, &funcs).unwrap();
        let result = passerine_expr::eval(&expr, &env);
        prop_assert_eq!(result.to_bits(), v.to_bits());
    }

    /// Any sequence of assignments and a trailing comma-joined read never
    /// panics and always reflects the last write (spec.md §8
    /// "eval(\"x = v, x\") == v").
    #[test]
    fn assign_then_read_matches_last_write(v in -1.0e9f64..1.0e9) {
        let text = format!("x = {v}, x");
        let result = calc(&text);
        prop_assert!((result - v).abs() <= v.abs() * 1e-9 + 1e-9);
    }
}
