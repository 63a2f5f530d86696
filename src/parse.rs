//! The shunting-yard parser (spec.md §4.E, component E).
//!
//! Converts a lexed token stream into a single AST root. Maintains the
//! three stacks spec.md describes (completed subtrees, pending operators,
//! in-progress call frames) plus the parenthesis-mode the identifier
//! look-ahead needs, all local to [`parse`] the way the source keeps the
//! whole parser state on its own stack frame.

use log::{debug, trace};

use crate::env::Env;
use crate::error::{ErrorKind, Syntax};
use crate::function::{Function, FunctionTable};
use crate::lex::{self, Token};
use crate::macros::MacroTable;
use crate::operator::{should_reduce, BinaryOp, UnaryOp};
use crate::span::{Span, Spanned};
use crate::tree::{FuncCall, Node};

/// What a call-open paren is standing for, bound at the moment the `(`
/// after an identifier is consumed (spec.md §4.E "Identifier disposition").
enum Callee {
    /// `$(...)`: defines a macro.
    Define,
    /// `name(...)` where `name` already names a macro.
    Macro(String),
    /// `name(...)` where `name` names a host function.
    Function(Function),
}

/// One entry per in-progress call, recording where its arguments begin on
/// the output stack so a trailing, not-yet-comma'd expression can be told
/// apart from an empty argument list at close time.
struct CallFrame {
    callee: Callee,
    args: Vec<Spanned<Node>>,
    out_height: usize,
}

/// An item on the pending-operator stack: either a real operator waiting
/// to reduce, or a bracket sentinel a reduction must stop at.
#[derive(Clone, Copy)]
enum StackOp {
    Unary(UnaryOp, Span),
    Binary(BinaryOp, Span),
    Paren,
    CallOpen,
}

/// Whether a following `(` would open a fresh group, start a call, or is
/// simply not allowed here (spec.md §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParenMode {
    Allowed,
    Expected,
    Forbidden,
}

struct Parser<'a> {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    text_len: usize,
    /// Byte offset "reached so far"; used as the `near` column for any
    /// error raised at the current point (spec.md §4.E "Error reporting").
    cursor: usize,
    env: &'a mut Env,
    funcs: &'a FunctionTable,
    macros: MacroTable,
    output: Vec<Spanned<Node>>,
    ops: Vec<StackOp>,
    frames: Vec<CallFrame>,
    paren_mode: ParenMode,
}

/// Lexes and parses `text` into a single AST root, bound to `env`'s
/// variable namespace and `funcs`' host function table.
pub(crate) fn parse(
    text: &str,
    env: &mut Env,
    funcs: &FunctionTable,
) -> Result<Spanned<Node>, Syntax> {
    let tokens = lex::lex(text)?;
    trace!("lexed {} tokens from {} bytes", tokens.len(), text.len());
    let mut parser = Parser {
        tokens,
        pos: 0,
        text_len: text.len(),
        cursor: 0,
        env,
        funcs,
        macros: MacroTable::new(),
        output: Vec::new(),
        ops: Vec::new(),
        frames: Vec::new(),
        paren_mode: ParenMode::Allowed,
    };
    parser.run()
}

impl<'a> Parser<'a> {
    fn err(&self, kind: ErrorKind) -> Syntax {
        Syntax::new(kind, self.cursor)
    }

    fn run(&mut self) -> Result<Spanned<Node>, Syntax> {
        while self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos].clone();
            match tok.item {
                Token::Ident(name) => self.handle_ident(name, tok.span)?,
                Token::Number(lit) => self.handle_number(&lit, tok.span)?,
                Token::LParen => self.handle_lparen(tok.span)?,
                Token::RParen => self.handle_rparen(tok.span)?,
                Token::Unary(op) => self.handle_unary(op, tok.span)?,
                Token::Binary(op) => self.handle_binary(op, tok.span)?,
            }
        }
        self.finish()
    }

    /// Pushes a freshly completed value and immediately folds in any
    /// pending unary prefixes: nothing can bind tighter than unary, so
    /// there is never a reason to leave one on the operator stack once its
    /// operand exists (spec.md §4.C prec 1).
    fn push_value(&mut self, node: Spanned<Node>) {
        self.output.push(node);
        while let Some(StackOp::Unary(op, span)) = self.ops.last().copied() {
            self.ops.pop();
            let child = self.output.pop().expect("unary operand just pushed");
            let full = Span::new(span.offset, child.span.end() - span.offset);
            self.output
                .push(Spanned::new(Node::Unary(op, Box::new(child)), full));
        }
    }

    fn resolve_callee(&self, name: &str) -> Option<Callee> {
        if name == "$" {
            Some(Callee::Define)
        } else if self.macros.contains(name) {
            Some(Callee::Macro(name.to_string()))
        } else if let Some(f) = self.funcs.get(name) {
            Some(Callee::Function(*f))
        } else {
            None
        }
    }

    fn handle_ident(&mut self, name: String, span: Span) -> Result<(), Syntax> {
        let next_is_lparen = matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.item),
            Some(Token::LParen)
        );

        if next_is_lparen {
            let lparen_span = self.tokens[self.pos + 1].span;
            self.pos += 2;
            self.cursor = lparen_span.end();
            let callee = self
                .resolve_callee(&name)
                .ok_or_else(|| self.err(ErrorKind::InvalidFuncName))?;
            debug!("opening call to `{}`", name);
            self.frames.push(CallFrame {
                callee,
                args: Vec::new(),
                out_height: self.output.len(),
            });
            self.ops.push(StackOp::CallOpen);
            // The `(` is already consumed above, so the parser is now
            // positioned just inside the call's argument list, same as
            // after any other grouping paren.
            self.paren_mode = ParenMode::Allowed;
        } else {
            let id = self.env.var(&name);
            self.push_value(Spanned::new(Node::Var(id), span));
            self.paren_mode = ParenMode::Forbidden;
            self.pos += 1;
            self.cursor = span.end();
        }
        Ok(())
    }

    fn handle_number(&mut self, lit: &str, span: Span) -> Result<(), Syntax> {
        self.pos += 1;
        self.cursor = span.end();
        let value = parse_number(lit).ok_or_else(|| self.err(ErrorKind::BadVariableName))?;
        self.push_value(Spanned::new(Node::Const(value), span));
        self.paren_mode = ParenMode::Forbidden;
        Ok(())
    }

    fn handle_lparen(&mut self, span: Span) -> Result<(), Syntax> {
        self.pos += 1;
        self.cursor = span.end();
        if self.paren_mode == ParenMode::Forbidden {
            return Err(self.err(ErrorKind::BadCall));
        }
        self.ops.push(StackOp::Paren);
        self.paren_mode = ParenMode::Allowed;
        Ok(())
    }

    fn handle_rparen(&mut self, span: Span) -> Result<(), Syntax> {
        self.pos += 1;
        self.cursor = span.end();
        loop {
            match self.ops.pop() {
                Some(StackOp::Binary(op, _)) => self.emit_binary(op)?,
                Some(StackOp::Unary(op, uspan)) => self.emit_unary(op, uspan)?,
                Some(StackOp::Paren) => {
                    self.paren_mode = ParenMode::Forbidden;
                    // The group's value wasn't pushed through `push_value`
                    // (it landed on `output` via `emit_binary`/`emit_unary`
                    // instead), so a unary sitting below the `(` on `ops`
                    // never got a chance to fold over it. Re-push it so
                    // `-(2+3)**2` binds as `(-(2+3))**2`, not `-((2+3)**2)`.
                    if let Some(value) = self.output.pop() {
                        self.push_value(value);
                    }
                    return Ok(());
                }
                Some(StackOp::CallOpen) => return self.close_call(span),
                None => return Err(self.err(ErrorKind::BadParens)),
            }
        }
    }

    fn handle_unary(&mut self, op: UnaryOp, span: Span) -> Result<(), Syntax> {
        self.pos += 1;
        self.cursor = span.end();
        self.ops.push(StackOp::Unary(op, span));
        self.paren_mode = ParenMode::Allowed;
        Ok(())
    }

    fn handle_binary(&mut self, op: BinaryOp, span: Span) -> Result<(), Syntax> {
        self.pos += 1;
        self.cursor = span.end();
        self.reduce_while(op)?;

        if op == BinaryOp::Comma {
            if matches!(self.ops.last(), Some(StackOp::CallOpen)) {
                let value = self
                    .output
                    .pop()
                    .ok_or_else(|| self.err(ErrorKind::MissExpectedOperand))?;
                self.frames
                    .last_mut()
                    .expect("CallOpen sentinel implies an open frame")
                    .args
                    .push(value);
                self.paren_mode = ParenMode::Allowed;
                return Ok(());
            }
        }

        self.ops.push(StackOp::Binary(op, span));
        self.paren_mode = ParenMode::Allowed;
        Ok(())
    }

    /// Reduces the top of the operator stack while it binds at least as
    /// tightly as `incoming` (spec.md §4.C `should_reduce`); stops at a
    /// bracket sentinel or an empty stack.
    fn reduce_while(&mut self, incoming: BinaryOp) -> Result<(), Syntax> {
        while let Some(StackOp::Binary(top, _)) = self.ops.last().copied() {
            if should_reduce(incoming, top) {
                self.ops.pop();
                self.emit_binary(top)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn emit_binary(&mut self, op: BinaryOp) -> Result<(), Syntax> {
        let right = self
            .output
            .pop()
            .ok_or_else(|| self.err(ErrorKind::MissExpectedOperand))?;
        let left = self
            .output
            .pop()
            .ok_or_else(|| self.err(ErrorKind::MissExpectedOperand))?;
        if op == BinaryOp::Assign && !matches!(left.item, Node::Var(_)) {
            return Err(self.err(ErrorKind::BadAssignment));
        }
        let span = Span::new(left.span.offset, right.span.end() - left.span.offset);
        self.output
            .push(Spanned::new(Node::Binary(op, Box::new(left), Box::new(right)), span));
        Ok(())
    }

    fn emit_unary(&mut self, op: UnaryOp, span: Span) -> Result<(), Syntax> {
        let child = self
            .output
            .pop()
            .ok_or_else(|| self.err(ErrorKind::MissExpectedOperand))?;
        let full = Span::new(span.offset, child.span.end() - span.offset);
        self.output
            .push(Spanned::new(Node::Unary(op, Box::new(child)), full));
        Ok(())
    }

    fn close_call(&mut self, rparen_span: Span) -> Result<(), Syntax> {
        let frame = self.frames.pop().expect("CallOpen sentinel implies an open frame");
        let mut args = frame.args;
        if self.output.len() > frame.out_height {
            args.push(self.output.pop().expect("checked len above"));
        }
        self.paren_mode = ParenMode::Forbidden;

        match frame.callee {
            Callee::Define => {
                if args.is_empty() {
                    return Err(self.err(ErrorKind::TooFewFuncArgs));
                }
                let name = match &args[0].item {
                    Node::Var(id) => self.env.name(*id).to_string(),
                    _ => return Err(self.err(ErrorKind::FirstArgIsNotVar)),
                };
                debug!("defining macro `{}` with {} body node(s)", name, args.len() - 1);
                self.macros.define(name, args);
                self.push_value(Spanned::new(Node::Const(0.0), rparen_span));
            }
            Callee::Macro(name) => {
                let expanded = self.expand_macro(&name, args, rparen_span)?;
                self.push_value(expanded);
            }
            Callee::Function(function) => {
                let call = FuncCall::new(function, args);
                self.push_value(Spanned::new(Node::Func(call), rparen_span));
            }
        }
        Ok(())
    }

    /// Instantiates a macro call: binds each actual to a positional `$N`
    /// variable, then chains those assignments in front of a deep-cloned
    /// copy of the macro's body (spec.md §4.E, §4.F).
    fn expand_macro(
        &mut self,
        name: &str,
        call_args: Vec<Spanned<Node>>,
        span: Span,
    ) -> Result<Spanned<Node>, Syntax> {
        let body: Vec<Spanned<Node>> = {
            let found = self.macros.get(name).expect("callee resolved against this macro");
            found.body[1..].iter().map(Node::deep_clone).collect()
        };
        trace!("expanding macro `{}` with {} actual(s)", name, call_args.len());

        let mut chain: Vec<Spanned<Node>> = Vec::with_capacity(call_args.len() + body.len());
        for (i, actual) in call_args.into_iter().enumerate() {
            let param_name = format!("${}", i + 1);
            let id = self.env.var(&param_name);
            let var_node = Spanned::new(Node::Var(id), actual.span);
            let assign_span = Span::new(var_node.span.offset, actual.span.end() - var_node.span.offset);
            chain.push(Spanned::new(
                Node::Binary(BinaryOp::Assign, Box::new(var_node), Box::new(actual)),
                assign_span,
            ));
        }
        chain.extend(body);

        let mut rev = chain.into_iter().rev();
        let mut acc = match rev.next() {
            Some(node) => node,
            None => Spanned::new(Node::Const(0.0), span),
        };
        for node in rev {
            let combined = Span::new(node.span.offset, acc.span.end() - node.span.offset);
            acc = Spanned::new(Node::Binary(BinaryOp::Comma, Box::new(node), Box::new(acc)), combined);
        }
        Ok(acc)
    }

    fn finish(mut self) -> Result<Spanned<Node>, Syntax> {
        self.cursor = self.text_len;
        while let Some(op) = self.ops.pop() {
            match op {
                StackOp::Binary(b, _) => self.emit_binary(b)?,
                StackOp::Unary(u, span) => self.emit_unary(u, span)?,
                StackOp::Paren | StackOp::CallOpen => return Err(self.err(ErrorKind::BadParens)),
            }
        }
        match self.output.pop() {
            None => Ok(Spanned::new(Node::Const(0.0), Span::point(0))),
            Some(root) if self.output.is_empty() => Ok(root),
            Some(_) => Err(self.err(ErrorKind::Unknown)),
        }
    }
}

/// Validates and converts a lexed numeric lexeme (spec.md §4.B "Numeric
/// literals"): at most one `.`, at least one digit.
fn parse_number(lit: &str) -> Option<f64> {
    if lit.matches('.').count() > 1 {
        return None;
    }
    if !lit.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    lit.parse::<f64>().ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eval;
    use crate::function::Context;

    fn run(text: &str) -> Result<f64, Syntax> {
        let mut env = Env::new();
        let funcs = FunctionTable::new();
        let root = parse(text, &mut env, &funcs)?;
        Ok(eval::eval(&root, &env))
    }

    fn run_with(text: &str, funcs: &FunctionTable) -> Result<f64, Syntax> {
        let mut env = Env::new();
        let root = parse(text, &mut env, funcs)?;
        Ok(eval::eval(&root, &env))
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(run("").unwrap(), 0.0);
        assert_eq!(run("  # just a comment").unwrap(), 0.0);
    }

    #[test]
    fn precedence_mul_over_add() {
        assert_eq!(run("2+3*4").unwrap(), 14.0);
    }

    #[test]
    fn pow_is_right_associative_in_parse() {
        assert_eq!(run("2**2**3").unwrap(), 256.0);
    }

    #[test]
    fn unary_over_parenthesised_group_binds_before_pow() {
        // Unary prec 1 is tighter than `**` (prec 2): `-(2+3)**2` is
        // `(-(2+3))**2` = 25, not `-((2+3)**2)` = -25.
        assert_eq!(run("-(2+3)**2").unwrap(), 25.0);
    }

    #[test]
    fn unary_over_parenthesised_group_binds_before_add() {
        // `^(1)+2` is `(~1)+2` = 0, not `~(1+2)` = -4.
        assert_eq!(run("^(1)+2").unwrap(), 0.0);
    }

    #[test]
    fn sequencing_and_assignment() {
        assert_eq!(run("x=5, y=3, x+y").unwrap(), 8.0);
    }

    #[test]
    fn newline_is_auto_comma() {
        assert_eq!(run("a=3\nb=4\na").unwrap(), 3.0);
    }

    #[test]
    fn host_function_calls() {
        fn add(args: &[f64], _: &mut dyn Context) -> f64 {
            args.iter().sum()
        }
        fn next(args: &[f64], _: &mut dyn Context) -> f64 {
            args[0] + 1.0
        }
        let mut funcs = FunctionTable::new();
        funcs.register(Function::stateless("add", add));
        funcs.register(Function::stateless("next", next));
        assert_eq!(run_with("add(1,2) + next(3)", &funcs).unwrap(), 7.0);
    }

    #[test]
    fn macro_mysum() {
        assert_eq!(run("$(mysum, $1 + $2), mysum(2, 3)").unwrap(), 5.0);
    }

    #[test]
    fn macro_triw() {
        assert_eq!(
            run("$(triw, ($1 * 256) & 255), triw(0.1)+triw(0.7)+triw(0.2)").unwrap(),
            255.0
        );
    }

    #[test]
    fn unmatched_open_paren_is_bad_parens() {
        let err = run("(").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParens);
        assert_eq!(err.near(), 1);
    }

    #[test]
    fn number_after_closed_call_is_unexpected() {
        let err = run("()3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedNumber);
        assert_eq!(err.near(), 2);
    }

    #[test]
    fn assign_to_literal_is_bad_assignment() {
        let err = run("2=3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadAssignment);
        assert_eq!(err.near(), 3);
    }

    #[test]
    fn macro_def_with_no_args_is_too_few() {
        let err = run("$()").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooFewFuncArgs);
        assert_eq!(err.near(), 3);
    }

    #[test]
    fn macro_def_first_arg_must_be_var() {
        let err = run("$(1)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FirstArgIsNotVar);
        assert_eq!(err.near(), 4);
    }

    #[test]
    fn macro_cannot_self_reference_at_definition_time() {
        let err = run("$(recurse, recurse()), recurse()").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFuncName);
    }

    #[test]
    fn variable_is_idempotent_across_uses() {
        let mut env = Env::new();
        let funcs = FunctionTable::new();
        let root = parse("x = 1, x = x + 1, x", &mut env, &funcs).unwrap();
        assert_eq!(eval::eval(&root, &env), 2.0);
        assert_eq!(env.len(), 1);
    }
}
