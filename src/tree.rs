//! The AST node model (spec.md §3 "AST node", component D) and its
//! cloner (component F).

use std::cell::RefCell;

use crate::env::{Number, VarId};
use crate::function::{Context, Function};
use crate::operator::{BinaryOp, UnaryOp};
use crate::span::Spanned;

/// A function-call node's owned state: the descriptor it was bound to at
/// parse time, its (already-parsed, not-yet-evaluated) argument
/// subtrees, and a private context buffer.
///
/// The context is behind a `RefCell` because evaluation only ever holds
/// `&Node` (the tree is shared by repeated `eval` calls), but a host
/// function that uses its context needs to mutate it in place.
pub struct FuncCall {
    pub function: Function,
    pub args: Vec<Spanned<Node>>,
    pub context: RefCell<Box<dyn Context>>,
}

impl FuncCall {
    pub fn new(function: Function, args: Vec<Spanned<Node>>) -> FuncCall {
        let context = function.make_context();
        FuncCall {
            function,
            args,
            context: RefCell::new(context),
        }
    }
}

/// One node of the compiled expression tree. Unary nodes always carry
/// exactly one child, binary nodes exactly two; `Binary(Assign, ...)`'s
/// left child is guaranteed by the parser to be `Var`.
pub enum Node {
    Const(Number),
    Var(VarId),
    Unary(UnaryOp, Box<Spanned<Node>>),
    Binary(BinaryOp, Box<Spanned<Node>>, Box<Spanned<Node>>),
    Func(FuncCall),
}

impl Node {
    /// Deep-copies a subtree (spec.md §4.F). Shares the `Function`
    /// descriptor (it's `Copy` and caller-owned/'static) but allocates a
    /// fresh context for every `Func` node it copies — clones never
    /// inherit a previous call's context contents, matching the source's
    /// documented behaviour (spec.md §4.F, §9).
    pub fn deep_clone(spanned: &Spanned<Node>) -> Spanned<Node> {
        let item = match &spanned.item {
            Node::Const(n) => Node::Const(*n),
            Node::Var(id) => Node::Var(*id),
            Node::Unary(op, child) => {
                Node::Unary(*op, Box::new(Node::deep_clone(child)))
            }
            Node::Binary(op, left, right) => Node::Binary(
                *op,
                Box::new(Node::deep_clone(left)),
                Box::new(Node::deep_clone(right)),
            ),
            Node::Func(call) => {
                let args = call.args.iter().map(Node::deep_clone).collect();
                Node::Func(FuncCall::new(call.function, args))
            }
        };
        Spanned::new(item, spanned.span)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::span::Span;

    #[test]
    fn clone_const_is_independent() {
        let original = Spanned::new(Node::Const(3.0), Span::point(0));
        let clone = Node::deep_clone(&original);
        match clone.item {
            Node::Const(n) => assert_eq!(n, 3.0),
            _ => panic!("expected Const"),
        }
    }

    #[test]
    fn clone_func_gets_fresh_context() {
        fn noop(_: &[Number], _: &mut dyn Context) -> Number {
            0.0
        }
        let f = crate::function::Function::stateless("noop", noop);
        let call = FuncCall::new(f, vec![]);
        let original = Spanned::new(Node::Func(call), Span::point(0));
        let clone = Node::deep_clone(&original);
        match clone.item {
            Node::Func(call) => assert_eq!(call.args.len(), 0),
            _ => panic!("expected Func"),
        }
    }
}
