use crate::plat::{MemoryAccess, RegisterAccess};

use super::{BinOp, Expr, ExprError, UnOp};

impl Expr {
    /// Evaluates the expression against a machine's registers and memory.
    ///
    /// Arithmetic is on `i32` and any overflow is an error. `&&` and `||` short-circuit.
    pub fn eval<E>(&self, env: &E) -> Result<i32, ExprError>
    where
        E: RegisterAccess + MemoryAccess + ?Sized,
    {
        match self {
            Self::Literal(v) => Ok(*v),
            Self::Register(reg) => Ok(env.reg_value(*reg) as i32),
            Self::Unary(op, operand) => {
                let v = operand.eval(env)?;
                match op {
                    UnOp::Neg => v.checked_neg().ok_or(ExprError::Overflow("negation")),
                    UnOp::Not => Ok(i32::from(v == 0)),
                    UnOp::Deref => Ok(env.read_word(v as u32)? as i32),
                }
            }
            Self::Binary(op, lhs, rhs) => {
                let a = lhs.eval(env)?;
                let b = || rhs.eval(env);
                match op {
                    BinOp::Or => Ok(i32::from(a != 0 || b()? != 0)),
                    BinOp::And => Ok(i32::from(a != 0 && b()? != 0)),
                    BinOp::Eq => Ok(i32::from(a == b()?)),
                    BinOp::Neq => Ok(i32::from(a != b()?)),
                    BinOp::Add => a.checked_add(b()?).ok_or(ExprError::Overflow("addition")),
                    BinOp::Sub => a.checked_sub(b()?).ok_or(ExprError::Overflow("subtraction")),
                    BinOp::Mul => a
                        .checked_mul(b()?)
                        .ok_or(ExprError::Overflow("multiplication")),
                    BinOp::Div => match b()? {
                        0 => Err(ExprError::DivideByZero),
                        b => a.checked_div(b).ok_or(ExprError::Overflow("division")),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{tests::TestEnv, ExprEngine, ExprError};
    use crate::plat::PlatformError;

    fn eval(text: &str) -> Result<i32, ExprError> {
        ExprEngine::new().parse(text)?.eval(&TestEnv)
    }

    #[test]
    fn test_arith() {
        assert_eq!(eval("1+2"), Ok(3));
        assert_eq!(eval("(4 + 3) * (2 - 1)"), Ok(7));
        assert_eq!(eval("10 / 3"), Ok(3));
        assert_eq!(eval("-7 / 2"), Ok(-3));
        assert_eq!(eval("2 - 5"), Ok(-3));
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval("1 == 1"), Ok(1));
        assert_eq!(eval("1 != 1"), Ok(0));
        assert_eq!(eval("!0"), Ok(1));
        assert_eq!(eval("!5"), Ok(0));
        assert_eq!(eval("2 && 0 || 3"), Ok(1));
        assert_eq!(eval("$a0 == 10 && pc == 0x80000000"), Ok(1));
    }

    #[test]
    fn test_short_circuit_skips_bad_operand() {
        assert_eq!(eval("0 && 1/0"), Ok(0));
        assert_eq!(eval("1 || 1/0"), Ok(1));
    }

    #[test]
    fn test_overflow_and_div_zero() {
        assert_eq!(eval("2147483647 + 1"), Err(ExprError::Overflow("addition")));
        assert_eq!(eval("0x80000000 - 1"), Err(ExprError::Overflow("subtraction")));
        assert_eq!(eval("65536 * 65536"), Err(ExprError::Overflow("multiplication")));
        assert_eq!(eval("0x80000000 / -1"), Err(ExprError::Overflow("division")));
        assert_eq!(eval("-0x80000000"), Err(ExprError::Overflow("negation")));
        assert_eq!(eval("1 / (2 - 2)"), Err(ExprError::DivideByZero));
    }

    #[test]
    fn test_deref() {
        assert_eq!(eval("*0x20"), Ok(0x21));
        assert_eq!(eval("*$sp + 1"), Ok(0x102));
        assert!(matches!(
            eval("*0x2000"),
            Err(ExprError::Memory(PlatformError::OutOfBound { addr: 0x2000, .. }))
        ));
    }
}
