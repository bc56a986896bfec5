use crate::ast::nodes::{BinaryOp, UnaryOp};

use super::types::Type;

/// Check a binary operation and return the result type, or an error message.
///
/// The result type is fixed by the operator, so callers use it even when
/// the operands are rejected.
pub fn check_binary_op(left: Type, op: BinaryOp, right: Type) -> Result<Type, String> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if left == Type::INT && right == Type::INT {
                Ok(Type::INT)
            } else {
                Err(format!(
                    "non-Int arguments: {} {} {}",
                    left,
                    op.symbol(),
                    right
                ))
            }
        }
        BinaryOp::Lt | BinaryOp::Le => {
            if left == Type::INT && right == Type::INT {
                Ok(Type::BOOL)
            } else {
                Err(format!(
                    "non-Int arguments: {} {} {}",
                    left,
                    op.symbol(),
                    right
                ))
            }
        }
        // Equality is decided at run time; any two typable operands may be compared.
        BinaryOp::Eq => Ok(Type::BOOL),
    }
}

/// Result type of a binary operator regardless of its operands.
pub fn binary_result(op: BinaryOp) -> Type {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => Type::INT,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Eq => Type::BOOL,
    }
}

/// Check a unary operation and return the result type.
pub fn check_unary_op(op: UnaryOp, operand: Type) -> Result<Type, String> {
    let expected = unary_result(op);
    if operand == expected {
        Ok(expected)
    } else {
        let spelled = match op {
            UnaryOp::Neg => "~",
            UnaryOp::Not => "not",
        };
        Err(format!(
            "Argument of '{}' has type {} instead of {}.",
            spelled, operand, expected
        ))
    }
}

/// Result type of a unary operator, which is also the operand type it needs.
pub fn unary_result(op: UnaryOp) -> Type {
    match op {
        UnaryOp::Neg => Type::INT,
        UnaryOp::Not => Type::BOOL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic() {
        assert_eq!(check_binary_op(Type::INT, BinaryOp::Add, Type::INT), Ok(Type::INT));
        assert_eq!(check_binary_op(Type::INT, BinaryOp::Div, Type::INT), Ok(Type::INT));
    }

    #[test]
    fn string_sub_fails() {
        let err = check_binary_op(Type::STRING, BinaryOp::Sub, Type::INT).unwrap_err();
        assert_eq!(err, "non-Int arguments: String - Int");
    }

    #[test]
    fn comparison_returns_bool() {
        assert_eq!(check_binary_op(Type::INT, BinaryOp::Lt, Type::INT), Ok(Type::BOOL));
        assert!(check_binary_op(Type::BOOL, BinaryOp::Le, Type::INT).is_err());
    }

    #[test]
    fn equality_accepts_any_operands() {
        assert_eq!(check_binary_op(Type::INT, BinaryOp::Eq, Type::STRING), Ok(Type::BOOL));
        assert_eq!(
            check_binary_op(Type::SelfType, BinaryOp::Eq, Type::OBJECT),
            Ok(Type::BOOL)
        );
    }

    #[test]
    fn self_type_is_not_int() {
        assert!(check_binary_op(Type::SelfType, BinaryOp::Add, Type::INT).is_err());
    }

    #[test]
    fn unary_rules() {
        assert_eq!(check_unary_op(UnaryOp::Neg, Type::INT), Ok(Type::INT));
        assert_eq!(check_unary_op(UnaryOp::Not, Type::BOOL), Ok(Type::BOOL));
        assert_eq!(
            check_unary_op(UnaryOp::Not, Type::INT).unwrap_err(),
            "Argument of 'not' has type Int instead of Bool."
        );
        assert!(check_unary_op(UnaryOp::Neg, Type::BOOL).is_err());
    }

    #[test]
    fn fixed_result_types() {
        assert_eq!(binary_result(BinaryOp::Mul), Type::INT);
        assert_eq!(binary_result(BinaryOp::Eq), Type::BOOL);
        assert_eq!(unary_result(UnaryOp::Neg), Type::INT);
    }
}
