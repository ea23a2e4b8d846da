use super::{BinOp, Expr, ExprEngine, ExprError, Token, UnOp, WithSpan};

/// A precedence-climbing parser over lexed tokens.
pub struct Parser<'t, 'a> {
    toks: &'t [WithSpan<Token<'a>>],
    pos: usize,
    engine: &'t ExprEngine,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub fn new(toks: &'t [WithSpan<Token<'a>>], engine: &'t ExprEngine) -> Self {
        Self {
            toks,
            pos: 0,
            engine,
        }
    }

    /// Parses the whole token stream as one expression.
    pub fn parse(mut self) -> Result<Expr, ExprError> {
        if self.toks.is_empty() {
            return Err(ExprError::Empty);
        }
        let expr = self.parse_binary(0)?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) if tok.item == Token::RParen => Err(ExprError::UnbalancedParens {
                position: tok.offset,
            }),
            Some(tok) => Err(ExprError::UnexpectedToken {
                position: tok.offset,
            }),
        }
    }

    fn peek(&self) -> Option<WithSpan<Token<'a>>> {
        self.toks.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<WithSpan<Token<'a>>> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(|t| BinOp::from_token(t.item)) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // left associative: the right operand only takes tighter operators
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek().map(|t| t.item) {
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Not) => UnOp::Not,
            Some(Token::Star) => UnOp::Deref,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let tok = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match tok.item {
            Token::Dec(digits) => digits
                .parse::<i32>()
                .map(Expr::Literal)
                .map_err(|_| ExprError::LiteralOverflow(digits.to_string())),
            Token::Hex(digits) => u32::from_str_radix(digits, 16)
                .map(|v| Expr::Literal(v as i32))
                .map_err(|_| ExprError::LiteralOverflow(format!("0x{digits}"))),
            Token::Register(name) | Token::Ident(name) => self
                .engine
                .register(name)
                .map(Expr::Register)
                .ok_or_else(|| ExprError::UnknownRegister {
                    name: name.to_string(),
                    position: tok.offset,
                }),
            Token::LParen => {
                let inner = self.parse_binary(0)?;
                match self.next() {
                    Some(WithSpan {
                        item: Token::RParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(ExprError::UnbalancedParens {
                        position: tok.offset,
                    }),
                }
            }
            _ => Err(ExprError::UnexpectedToken {
                position: tok.offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plat::{RegRef, Register};

    fn parse(text: &str) -> Result<Expr, ExprError> {
        ExprEngine::new().parse(text)
    }

    fn lit(v: i32) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinOp::Add,
                lit(1),
                Box::new(Expr::Binary(BinOp::Mul, lit(2), lit(3)))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Expr::Binary(
                BinOp::Sub,
                Box::new(Expr::Binary(BinOp::Sub, lit(8), lit(4))),
                lit(2)
            )
        );
    }

    #[test]
    fn test_unary_and_parens() {
        assert_eq!(
            parse("-(1)").unwrap(),
            Expr::Unary(UnOp::Neg, lit(1))
        );
        assert_eq!(
            parse("*$sp").unwrap(),
            Expr::Unary(UnOp::Deref, Box::new(Expr::Register(RegRef::Gpr(Register::Sp))))
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("0xffffffff").unwrap(), Expr::Literal(-1));
        assert_eq!(
            parse("4294967296"),
            Err(ExprError::LiteralOverflow("4294967296".to_string()))
        );
        assert_eq!(
            parse("0x100000000"),
            Err(ExprError::LiteralOverflow("0x100000000".to_string()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(ExprError::Empty));
        assert_eq!(parse("1+"), Err(ExprError::UnexpectedEnd));
        assert_eq!(parse("(1+2"), Err(ExprError::UnbalancedParens { position: 0 }));
        assert_eq!(parse("1+2)"), Err(ExprError::UnbalancedParens { position: 3 }));
        assert_eq!(parse("1 2"), Err(ExprError::UnexpectedToken { position: 2 }));
        assert_eq!(parse("*/"), Err(ExprError::UnexpectedToken { position: 1 }));
        assert_eq!(
            parse("$foo"),
            Err(ExprError::UnknownRegister {
                name: "foo".to_string(),
                position: 0
            })
        );
    }
}
