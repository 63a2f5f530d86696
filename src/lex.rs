//! Token classifier (spec.md §4.B, component B).
//!
//! The lexer is *stateful*: a single flags word records what kind of
//! token is acceptable next, and every rule below both consumes some
//! input and produces the flags for the following token. This mirrors
//! the source's "given remaining text and current flags, return
//! (consumed-length, updated-flags)" contract; we fold the whole scan
//! into one pass that returns a finished token stream instead of handing
//! control back to a caller one token at a time, since nothing here
//! needs to interleave with anything but the parser that immediately
//! consumes it.

use crate::error::{ErrorKind, Syntax};
use crate::operator::Operator;
use crate::span::{Span, Spanned};

bitflags::bitflags! {
    /// What the lexer will accept as the next token. Field names match
    /// spec.md §4.B's flag list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Flags: u16 {
        const TOP     = 1 << 0;
        const TOPEN   = 1 << 1;
        const TCLOSE  = 1 << 2;
        const TNUMBER = 1 << 3;
        const TWORD   = 1 << 4;
        const UNARY   = 1 << 5;
        const COMMA   = 1 << 6;
    }
}

const TDEFAULT: Flags = Flags::TOPEN.union(Flags::TNUMBER).union(Flags::TWORD);

/// A classified token span. Numbers are kept as their raw lexeme; the
/// parser validates and converts them (spec.md §4.B: "final numeric
/// validity is re-checked by parse_number").
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(String),
    Ident(String),
    LParen,
    RParen,
    Unary(crate::operator::UnaryOp),
    Binary(crate::operator::BinaryOp),
}

/// True for any byte that may start an identifier: spec.md §4.B's "any
/// byte whose unsigned value is >= 0x40 except `^` and `|`, or `$`". This
/// deliberately admits UTF-8 continuation/lead bytes above 0x7F, so
/// non-ASCII names are accepted as opaque byte sequences.
fn is_name_start(b: u8) -> bool {
    b == b'$' || (b >= 0x40 && b != b'^' && b != b'|')
}

/// Identifier continuation additionally allows `#` and ASCII digits.
fn is_name_continue(b: u8) -> bool {
    is_name_start(b) || b == b'#' || b.is_ascii_digit()
}

struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    flags: Flags,
    tokens: Vec<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    fn err(&self, kind: ErrorKind) -> Syntax {
        Syntax::new(kind, self.offset)
    }

    /// Runs the whole classifier loop to completion.
    fn run(mut self) -> Result<Vec<Spanned<Token>>, Syntax> {
        while self.offset < self.text.len() {
            self.step()?;
        }
        Ok(self.tokens)
    }

    fn step(&mut self) -> Result<(), Syntax> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let c = bytes[0];

        match c {
            // Rule 1: line comment.
            b'#' => {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.offset += len;
                Ok(())
            }

            // Rule 2: newline, auto-comma.
            b'\n' => self.newline(),

            // Rule 3: other whitespace.
            _ if c.is_ascii_whitespace() => {
                let len = rest
                    .bytes()
                    .take_while(|b| b.is_ascii_whitespace() && *b != b'\n')
                    .count();
                self.offset += len.max(1);
                Ok(())
            }

            // Rule 4: numeric literal.
            _ if c.is_ascii_digit() => self.number(),

            // Rule 6: parentheses.
            b'(' => self.open_paren(),
            b')' => self.close_paren(),

            // Rule 5: identifier.
            _ if is_name_start(c) => self.identifier(),

            // Rule 7: operator.
            _ => self.operator(),
        }
    }

    fn newline(&mut self) -> Result<(), Syntax> {
        // Consume the newline and any trailing whitespace. Whether this
        // run turns into a comma depends on the flags the *previous*
        // token left behind: only if an operator was expected next (TOP)
        // were we in "an operand just finished" position.
        let comma_pos = self.offset;
        let rest = self.rest();
        let ws = rest
            .bytes()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.offset += ws.max(1);

        if self.flags.contains(Flags::TOP) {
            let next_non_space = self.rest().as_bytes().first().copied();
            let closes_or_ends = matches!(next_non_space, None | Some(b')'));
            if closes_or_ends {
                self.flags.remove(Flags::COMMA);
            } else {
                self.flags = Flags::TNUMBER | Flags::TWORD | Flags::TOPEN | Flags::COMMA;
                self.tokens.push(Spanned::new(
                    Token::Binary(crate::operator::BinaryOp::Comma),
                    Span::new(comma_pos, 1),
                ));
            }
        }
        Ok(())
    }

    fn number(&mut self) -> Result<(), Syntax> {
        if !self.flags.contains(Flags::TNUMBER) {
            return Err(self.err(ErrorKind::UnexpectedNumber));
        }
        let start = self.offset;
        let rest = self.rest();
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .count();
        self.offset += len;
        self.tokens.push(Spanned::new(
            Token::Number(rest[..len].to_string()),
            Span::new(start, len),
        ));
        self.flags = Flags::TOP | Flags::TCLOSE;
        Ok(())
    }

    fn identifier(&mut self) -> Result<(), Syntax> {
        if !self.flags.contains(Flags::TWORD) {
            return Err(self.err(ErrorKind::UnexpectedWord));
        }
        let start = self.offset;
        let rest = self.rest();
        let len = rest.bytes().take_while(|b| is_name_continue(*b)).count();
        self.offset += len;
        self.tokens.push(Spanned::new(
            Token::Ident(rest[..len].to_string()),
            Span::new(start, len),
        ));
        self.flags = Flags::TOP | Flags::TOPEN | Flags::TCLOSE;
        Ok(())
    }

    fn open_paren(&mut self) -> Result<(), Syntax> {
        if !self.flags.contains(Flags::TOPEN) {
            return Err(self.err(ErrorKind::UnexpectedParens));
        }
        self.tokens
            .push(Spanned::new(Token::LParen, Span::point(self.offset)));
        self.offset += 1;
        self.flags = Flags::TNUMBER | Flags::TWORD | Flags::TOPEN | Flags::TCLOSE;
        Ok(())
    }

    fn close_paren(&mut self) -> Result<(), Syntax> {
        if !self.flags.contains(Flags::TCLOSE) {
            return Err(self.err(ErrorKind::UnexpectedParens));
        }
        self.tokens
            .push(Spanned::new(Token::RParen, Span::point(self.offset)));
        self.offset += 1;
        self.flags = Flags::TOP | Flags::TCLOSE;
        Ok(())
    }

    fn operator(&mut self) -> Result<(), Syntax> {
        let start = self.offset;
        let rest = self.rest();

        if !self.flags.contains(Flags::TOP) {
            // Unary position: exactly one char, must be a unary operator.
            let c = rest.chars().next().unwrap();
            let op = crate::operator::Operator::lookup_unary(&c.to_string())
                .ok_or_else(|| self.err(ErrorKind::MissExpectedOperand))?;
            self.offset += c.len_utf8();
            self.tokens
                .push(Spanned::new(Token::Unary(op), Span::new(start, c.len_utf8())));
            self.flags = Flags::TNUMBER | Flags::TWORD | Flags::TOPEN | Flags::UNARY;
            return Ok(());
        }

        // Binary position: greedily extend while some known lexeme is a
        // prefix of what we've consumed so far; keep the longest one
        // that was ever recognised.
        let mut best: Option<(crate::operator::BinaryOp, usize)> = None;
        for lexeme in Operator::known_lexemes() {
            if rest.starts_with(lexeme) {
                if let Some(op) = Operator::lookup_binary(lexeme) {
                    let take = best.map(|(_, l)| l).unwrap_or(0);
                    if lexeme.len() > take {
                        best = Some((op, lexeme.len()));
                    }
                }
            }
        }
        let (op, len) = best.ok_or_else(|| self.err(ErrorKind::UnknownOperator))?;
        self.offset += len;
        self.tokens
            .push(Spanned::new(Token::Binary(op), Span::new(start, len)));
        self.flags = Flags::TNUMBER | Flags::TWORD | Flags::TOPEN;
        Ok(())
    }
}

/// Lexes `text` into a flat token stream, starting from the default
/// "expect an operand or an opening paren" state.
pub fn lex(text: &str) -> Result<Vec<Spanned<Token>>, Syntax> {
    Lexer {
        text,
        offset: 0,
        flags: TDEFAULT,
        tokens: Vec::new(),
    }
    .run()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::operator::BinaryOp;

    fn kinds(text: &str) -> Vec<Token> {
        lex(text).unwrap().into_iter().map(|t| t.item).collect()
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert_eq!(kinds(""), vec![]);
    }

    #[test]
    fn simple_arithmetic() {
        assert_eq!(
            kinds("2+3*4"),
            vec![
                Token::Number("2".into()),
                Token::Binary(BinaryOp::Add),
                Token::Number("3".into()),
                Token::Binary(BinaryOp::Mul),
                Token::Number("4".into()),
            ]
        );
    }

    #[test]
    fn greedy_operator_extension() {
        assert_eq!(kinds("1<<2"), vec![
            Token::Number("1".into()),
            Token::Binary(BinaryOp::Shl),
            Token::Number("2".into()),
        ]);
        assert_eq!(kinds("1>=2"), vec![
            Token::Number("1".into()),
            Token::Binary(BinaryOp::Ge),
            Token::Number("2".into()),
        ]);
    }

    #[test]
    fn comment_is_dropped() {
        assert_eq!(kinds("1 # trailing comment"), vec![Token::Number("1".into())]);
    }

    #[test]
    fn newline_becomes_comma() {
        assert_eq!(
            kinds("a\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Binary(BinaryOp::Comma),
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn newline_before_close_paren_is_suppressed() {
        assert_eq!(
            kinds("(a\n)"),
            vec![Token::LParen, Token::Ident("a".into()), Token::RParen]
        );
    }

    #[test]
    fn leading_minus_is_unary() {
        assert_eq!(
            kinds("-2"),
            vec![
                Token::Unary(crate::operator::UnaryOp::Neg),
                Token::Number("2".into()),
            ]
        );
    }

    #[test]
    fn stray_close_paren_is_rejected() {
        assert!(lex(")3").is_err());
    }

    #[test]
    fn non_ascii_identifier_is_opaque_bytes() {
        assert_eq!(kinds("Привет"), vec![Token::Ident("Привет".into())]);
    }

    #[test]
    fn macro_sigil_is_an_identifier() {
        assert_eq!(kinds("$"), vec![Token::Ident("$".into())]);
    }
}
