//! The `Plural-Forms` header grammar.
//!
//! A PO header declares how many plural forms the target language has and a
//! C-like expression mapping a count `n` to a form index:
//!
//! ```text
//! Plural-Forms: nplurals=3; plural=((n%10==1 && n%100!=11) ? 0 : ((n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20)) ? 1 : 2));
//! ```
//!
//! The expression is validated at parse time by compiling it to a small AST,
//! so a malformed formula surfaces when the header is read instead of on
//! first use.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::error::Error;

lazy_static! {
    static ref PLURAL_FORMS_RE: Regex =
        Regex::new(r"^\s*nplurals\s*=\s*(\d+)\s*;\s*plural\s*=\s*([^;]+);?\s*$").unwrap();
}

/// Parsed `Plural-Forms` declaration: form count plus the formula text.
///
/// The formula is kept as text so the value round-trips through headers and
/// batch-state blobs; it is recompiled on demand by [`PluralForms::form_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralForms {
    pub nplurals: usize,
    pub formula: String,
}

impl PluralForms {
    /// Parses a `Plural-Forms` header value.
    ///
    /// Fails when the `nplurals=N; plural=EXPR;` frame does not match or the
    /// expression itself does not compile.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let captures = PLURAL_FORMS_RE
            .captures(value)
            .ok_or_else(|| Error::PluralForms(value.trim().to_string()))?;
        let nplurals: usize = captures[1]
            .parse()
            .map_err(|_| Error::PluralForms(value.trim().to_string()))?;
        let formula = captures[2].trim().to_string();
        // Compile once to validate; the AST is rebuilt on evaluation.
        Expr::parse(&formula)?;
        Ok(PluralForms { nplurals, formula })
    }

    /// Evaluates the formula for a count, clamped into `0..nplurals`.
    pub fn form_index(&self, n: u64) -> usize {
        let index = Expr::parse(&self.formula)
            .map(|expr| expr.eval(n))
            .unwrap_or(0);
        let index = if index < 0 { 0 } else { index as usize };
        index.min(self.nplurals.saturating_sub(1))
    }
}

impl Display for PluralForms {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "nplurals={}; plural={};", self.nplurals, self.formula)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Expression over the count variable `n`, C semantics: comparisons yield
/// 0/1, any non-zero value is true.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    N,
    Num(i64),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn parse(input: &str) -> Result<Expr, Error> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source: input,
        };
        let expr = parser.ternary()?;
        if parser.pos != tokens.len() {
            return Err(Error::PluralForms(input.trim().to_string()));
        }
        Ok(expr)
    }

    fn eval(&self, n: u64) -> i64 {
        match self {
            Expr::N => n as i64,
            Expr::Num(value) => *value,
            Expr::Not(inner) => (inner.eval(n) == 0) as i64,
            Expr::Neg(inner) => -inner.eval(n),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(n);
                let r = rhs.eval(n);
                match op {
                    BinOp::Or => (l != 0 || r != 0) as i64,
                    BinOp::And => (l != 0 && r != 0) as i64,
                    BinOp::Eq => (l == r) as i64,
                    BinOp::Ne => (l != r) as i64,
                    BinOp::Lt => (l < r) as i64,
                    BinOp::Gt => (l > r) as i64,
                    BinOp::Le => (l <= r) as i64,
                    BinOp::Ge => (l >= r) as i64,
                    BinOp::Add => l.wrapping_add(r),
                    BinOp::Sub => l.wrapping_sub(r),
                    BinOp::Mul => l.wrapping_mul(r),
                    BinOp::Div => {
                        if r == 0 {
                            0
                        } else {
                            l.wrapping_div(r)
                        }
                    }
                    BinOp::Mod => {
                        if r == 0 {
                            0
                        } else {
                            l.wrapping_rem(r)
                        }
                    }
                }
            }
            Expr::Ternary(cond, then, otherwise) => {
                if cond.eval(n) != 0 {
                    then.eval(n)
                } else {
                    otherwise.eval(n)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    N,
    Num(i64),
    Question,
    Colon,
    LParen,
    RParen,
    Not,
    Op(BinOp),
}

fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let bad = || Error::PluralForms(input.trim().to_string());
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            'n' => {
                chars.next();
                tokens.push(Token::N);
            }
            '0'..='9' => {
                let mut value = 0i64;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                    value = value * 10 + d as i64;
                    chars.next();
                }
                tokens.push(Token::Num(value));
            }
            '?' => {
                chars.next();
                tokens.push(Token::Question);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return Err(bad());
                }
                tokens.push(Token::Op(BinOp::Or));
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return Err(bad());
                }
                tokens.push(Token::Op(BinOp::And));
            }
            '=' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(bad());
                }
                tokens.push(Token::Op(BinOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Ne));
                } else {
                    tokens.push(Token::Not);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Le));
                } else {
                    tokens.push(Token::Op(BinOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Ge));
                } else {
                    tokens.push(Token::Op(BinOp::Gt));
                }
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Sub));
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Mul));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Div));
            }
            '%' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Mod));
            }
            _ => return Err(bad()),
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser with C precedence; `?:` is right-associative.
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn bad(&self) -> Error {
        Error::PluralForms(self.source.trim().to_string())
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: Token) -> Result<(), Error> {
        if self.next() == Some(expected) {
            Ok(())
        } else {
            Err(self.bad())
        }
    }

    fn ternary(&mut self) -> Result<Expr, Error> {
        let cond = self.binary(0)?;
        if self.peek() == Some(Token::Question) {
            self.next();
            let then = self.ternary()?;
            self.eat(Token::Colon)?;
            let otherwise = self.ternary()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ))
        } else {
            Ok(cond)
        }
    }

    fn binary(&mut self, min_level: u8) -> Result<Expr, Error> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let level = precedence(op);
            if level < min_level {
                break;
            }
            self.next();
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, Error> {
        match self.peek() {
            Some(Token::Not) => {
                self.next();
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Some(Token::Op(BinOp::Sub)) => {
                self.next();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, Error> {
        match self.next() {
            Some(Token::N) => Ok(Expr::N),
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::LParen) => {
                let inner = self.ternary()?;
                self.eat(Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.bad()),
        }
    }
}

fn precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Or => 0,
        BinOp::And => 1,
        BinOp::Eq | BinOp::Ne => 2,
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => 3,
        BinOp::Add | BinOp::Sub => 4,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 5,
    }
}
