//! The expression evaluator used by `p` and `w`.

use nom_locate::LocatedSpan;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::plat::{MemoryAccess, PlatformError, RegRef, Register, RegisterAccess};

pub mod eval;
pub mod lexer;
pub mod parser;

pub type Span<'a> = LocatedSpan<&'a str>;

/// An error for the expression evaluator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("no match at position {position}")]
    NoMatch { position: usize },
    #[error("empty expression")]
    Empty,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at position {position}")]
    UnexpectedToken { position: usize },
    #[error("unbalanced parentheses at position {position}")]
    UnbalancedParens { position: usize },
    #[error("unknown register `{name}` at position {position}")]
    UnknownRegister { name: String, position: usize },
    #[error("literal `{0}` does not fit in 32 bits")]
    LiteralOverflow(String),
    #[error("integer overflow detected in {0}")]
    Overflow(&'static str),
    #[error("the divisor cannot be zero")]
    DivideByZero,
    #[error(transparent)]
    Memory(#[from] PlatformError),
}

/// An expression token. Output for the lexer, input for the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    /// Decimal digits.
    Dec(&'a str),
    /// Hex digits, without the `0x`.
    Hex(&'a str),
    /// A register name after a `$`.
    Register(&'a str),
    /// A bare identifier.
    Ident(&'a str),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Not,
    Eq,
    Neq,
    And,
    Or,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithSpan<T> {
    pub offset: usize,
    pub item: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Neq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_token(tok: Token<'_>) -> Option<Self> {
        match tok {
            Token::Or => Some(Self::Or),
            Token::And => Some(Self::And),
            Token::Eq => Some(Self::Eq),
            Token::Neq => Some(Self::Neq),
            Token::Plus => Some(Self::Add),
            Token::Minus => Some(Self::Sub),
            Token::Star => Some(Self::Mul),
            Token::Slash => Some(Self::Div),
            _ => None,
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Neq => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div => 5,
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i32),
    Register(RegRef),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Returns true if any operand of the expression is a register.
    pub fn involves_register(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Register(_) => true,
            Self::Unary(_, e) => e.involves_register(),
            Self::Binary(_, l, r) => l.involves_register() || r.involves_register(),
        }
    }

    pub fn classification(&self) -> Classification {
        if self.involves_register() {
            Classification::RegisterInvolved
        } else {
            Classification::PlainNumeric
        }
    }
}

/// Decides how `p` presents a result: register-derived values print in hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    RegisterInvolved,
    PlainNumeric,
}

/// The outcome of evaluating one expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub value: i32,
    pub classification: Classification,
}

/// Parses and evaluates expressions against a machine.
///
/// Building one resolves the register name table, so a monitor session builds it exactly once
/// at startup.
#[derive(Debug, Clone)]
pub struct ExprEngine {
    registers: FxHashMap<&'static str, RegRef>,
}

impl ExprEngine {
    pub fn new() -> Self {
        let mut registers: FxHashMap<&'static str, RegRef> = Register::ALL
            .iter()
            .map(|&reg| (reg.name().trim_start_matches('$'), RegRef::Gpr(reg)))
            .collect();
        registers.insert("zero", RegRef::Gpr(Register::Zero));
        registers.insert("fp", RegRef::Gpr(Register::S0));
        registers.insert("pc", RegRef::Pc);
        log::debug!("expression engine ready ({} register names)", registers.len());
        Self { registers }
    }

    /// Looks up a register by name. A leading `$` is optional.
    pub fn register(&self, name: &str) -> Option<RegRef> {
        let name = name.strip_prefix('$').unwrap_or(name);
        self.registers.get(name).copied()
    }

    pub fn parse(&self, text: &str) -> Result<Expr, ExprError> {
        let toks = lexer::lex_expr(text)?;
        parser::Parser::new(&toks, self).parse()
    }

    pub fn evaluate<E>(&self, text: &str, env: &E) -> Result<Evaluation, ExprError>
    where
        E: RegisterAccess + MemoryAccess + ?Sized,
    {
        let expr = self.parse(text)?;
        let value = expr.eval(env)?;
        Ok(Evaluation {
            value,
            classification: expr.classification(),
        })
    }
}

impl Default for ExprEngine {
    fn default() -> Self {
        Self::new()
    }
}
