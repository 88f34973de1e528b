//! Arithmetic with numeric promotion.
//!
//! If either operand is a float the result is a float; two ints stay
//! in the int domain, including `/` (truncating division) and `mod`.
//! Division or mod by integer zero is a runtime error; float
//! division follows IEEE 754 and float mod is the remainder
//! operation.

use lingo_core::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn name(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "subtract",
            ArithOp::Mul => "multiply",
            ArithOp::Div => "divide",
            ArithOp::Mod => "mod",
        }
    }
}

pub fn binary(op: ArithOp, a: Value, b: Value) -> Result<Value, String> {
    match (a, b) {
        (Value::Int(ia), Value::Int(ib)) => int_arith(op, ia, ib),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => {
            let fa = a.as_number().unwrap();
            let fb = b.as_number().unwrap();
            Ok(Value::Float(float_arith(op, fa, fb)))
        }
        _ => Err(format!(
            "cannot {} {} and {}",
            op.name(),
            a.type_name(),
            b.type_name()
        )),
    }
}

fn int_arith(op: ArithOp, a: i32, b: i32) -> Result<Value, String> {
    let v = match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => {
            if b == 0 {
                return Err("division by zero".to_string());
            }
            a.wrapping_div(b)
        }
        ArithOp::Mod => {
            if b == 0 {
                return Err("division by zero".to_string());
            }
            a.wrapping_rem(b)
        }
    };
    Ok(Value::Int(v))
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Mod => a % b,
    }
}

/// Arithmetic negation.
pub fn negate(v: Value) -> Result<Value, String> {
    match v {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(format!("cannot negate {}", v.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_add() {
        assert_eq!(binary(ArithOp::Add, Value::Int(1), Value::Int(2)), Ok(Value::Int(3)));
    }

    #[test]
    fn test_promotion_to_float() {
        assert_eq!(
            binary(ArithOp::Add, Value::Int(1), Value::Float(0.5)),
            Ok(Value::Float(1.5))
        );
        assert_eq!(
            binary(ArithOp::Mul, Value::Float(2.0), Value::Int(3)),
            Ok(Value::Float(6.0))
        );
    }

    #[test]
    fn test_int_division_truncates() {
        assert_eq!(binary(ArithOp::Div, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(binary(ArithOp::Div, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-3)));
    }

    #[test]
    fn test_mixed_division_is_float() {
        assert_eq!(
            binary(ArithOp::Div, Value::Int(7), Value::Float(2.0)),
            Ok(Value::Float(3.5))
        );
    }

    #[test]
    fn test_division_by_zero_errors() {
        assert!(binary(ArithOp::Div, Value::Int(1), Value::Int(0)).is_err());
        assert!(binary(ArithOp::Mod, Value::Int(1), Value::Int(0)).is_err());
    }

    #[test]
    fn test_float_division_by_zero_is_inf() {
        match binary(ArithOp::Div, Value::Float(1.0), Value::Float(0.0)) {
            Ok(Value::Float(f)) => assert!(f.is_infinite()),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_int_mod_sign_follows_dividend() {
        assert_eq!(binary(ArithOp::Mod, Value::Int(7), Value::Int(3)), Ok(Value::Int(1)));
        assert_eq!(binary(ArithOp::Mod, Value::Int(-7), Value::Int(3)), Ok(Value::Int(-1)));
    }

    #[test]
    fn test_float_mod() {
        assert_eq!(
            binary(ArithOp::Mod, Value::Float(7.5), Value::Int(2)),
            Ok(Value::Float(1.5))
        );
    }

    #[test]
    fn test_type_error() {
        let err = binary(ArithOp::Add, Value::Int(1), Value::Void).unwrap_err();
        assert!(err.contains("void"));
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(Value::Int(5)), Ok(Value::Int(-5)));
        assert_eq!(negate(Value::Float(2.5)), Ok(Value::Float(-2.5)));
        assert!(negate(Value::Void).is_err());
    }

    #[test]
    fn test_wrapping_overflow() {
        assert_eq!(
            binary(ArithOp::Add, Value::Int(i32::MAX), Value::Int(1)),
            Ok(Value::Int(i32::MIN))
        );
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int_ops_stay_int(a in any::<i32>(), b in any::<i32>()) {
            for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul] {
                prop_assert!(matches!(binary(op, Value::Int(a), Value::Int(b)), Ok(Value::Int(_))));
            }
        }

        #[test]
        fn prop_float_operand_promotes(a in any::<i32>(), b in proptest::num::f64::NORMAL) {
            for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div] {
                prop_assert!(matches!(binary(op, Value::Int(a), Value::Float(b)), Ok(Value::Float(_))));
            }
        }

        #[test]
        fn prop_negate_is_involutive(a in any::<i32>()) {
            let once = negate(Value::Int(a)).unwrap();
            prop_assert_eq!(negate(once), Ok(Value::Int(a)));
        }
    }
}
