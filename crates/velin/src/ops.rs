//! Operations on values.
//!
//! Every operator is a partial function over value pairs, implemented as an
//! exhaustive match. Unsupported combinations produce `cannot <op> T and U`
//! style errors; the evaluator attaches the operator's span.

use std::cmp::Ordering;

use crate::{
    diag::StrResult,
    geom::Rel,
    span::Span,
    value::Value,
};

use Value::{
    Angle, Args, Array, Auto, Bool, Bytes, Content, Dict, Duration, Float, Fraction, Func, Int,
    Label, Length, Module, None, Ratio, Regex, Relative, Str, Styles, Symbol, Type, Version,
};

/// Applies the unary plus operator: identity on numeric and dimensional
/// values.
pub fn pos(value: Value) -> StrResult<Value> {
    Ok(match value {
        Int(_) | Float(_) | Length(_) | Angle(_) | Ratio(_) | Relative(_) | Fraction(_)
        | Duration(_) => value,
        v => return Err(format!("cannot apply unary '+' to {}", v.ty())),
    })
}

/// Applies the unary minus operator.
pub fn neg(value: Value) -> StrResult<Value> {
    Ok(match value {
        Int(v) => Int(v.checked_neg().ok_or_else(too_large)?),
        Float(v) => Float(-v),
        Length(v) => Length(-v),
        Angle(v) => Angle(-v),
        Ratio(v) => Ratio(-v),
        Relative(v) => Relative(-v),
        Fraction(v) => Fraction(-v),
        Duration(v) => Duration(-v),
        v => return Err(format!("cannot apply '-' to {}", v.ty())),
    })
}

/// Applies the boolean `not` operator.
pub fn not(value: Value) -> StrResult<Value> {
    match value {
        Bool(v) => Ok(Bool(!v)),
        v => Err(format!("cannot apply 'not' to {}", v.ty())),
    }
}

/// Applies the boolean `and` operator.
///
/// Short-circuiting happens in the evaluator; this sees both operands.
pub fn and(lhs: Value, rhs: Value) -> StrResult<Value> {
    match (lhs, rhs) {
        (Bool(a), Bool(b)) => Ok(Bool(a && b)),
        (a, b) => Err(mismatch("apply 'and' to", &a, &b)),
    }
}

/// Applies the boolean `or` operator.
pub fn or(lhs: Value, rhs: Value) -> StrResult<Value> {
    match (lhs, rhs) {
        (Bool(a), Bool(b)) => Ok(Bool(a || b)),
        (a, b) => Err(mismatch("apply 'or' to", &a, &b)),
    }
}

/// Computes the sum of two values.
///
/// `none` acts as the additive identity on either side.
pub fn add(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(match (lhs, rhs) {
        (None, b) => b,
        (a, None) => a,

        (Int(a), Int(b)) => Int(a.checked_add(b).ok_or_else(too_large)?),
        (Int(a), Float(b)) => Float(a as f64 + b),
        (Float(a), Int(b)) => Float(a + b as f64),
        (Float(a), Float(b)) => Float(a + b),

        (Length(a), Length(b)) => Length(a + b),
        (Length(a), Ratio(b)) => Relative(Rel::new(a, b)),
        (Ratio(a), Length(b)) => Relative(Rel::new(b, a)),
        (Ratio(a), Ratio(b)) => Ratio(a + b),
        (Relative(a), Length(b)) => Relative(a + Rel::from(b)),
        (Length(a), Relative(b)) => Relative(Rel::from(a) + b),
        (Relative(a), Ratio(b)) => Relative(a + Rel::from(b)),
        (Ratio(a), Relative(b)) => Relative(Rel::from(a) + b),
        (Relative(a), Relative(b)) => Relative(a + b),

        (Angle(a), Angle(b)) => Angle(a + b),
        (Fraction(a), Fraction(b)) => Fraction(a + b),
        (Duration(a), Duration(b)) => Duration(a.checked_add(b)?),

        (Str(a), Str(b)) => Str(a.concat(&b)),
        (Str(a), Symbol(b)) => Str(a.concat(&b.get().to_string())),
        (Symbol(a), Str(b)) => Str(crate::types::Str::from(a.get()).concat(&b)),
        (Symbol(a), Symbol(b)) => {
            let mut buf = std::string::String::new();
            buf.push(a.get());
            buf.push(b.get());
            Str(buf.into())
        }

        (Content(a), Content(b)) => Content(a.concat(&b)),
        (Content(a), Str(b)) => {
            Content(a.concat(&crate::types::Content::text(b, Span::detached())))
        }
        (Str(a), Content(b)) => {
            Content(crate::types::Content::text(a, Span::detached()).concat(&b))
        }
        (Content(a), Symbol(b)) => {
            Content(a.concat(&crate::types::Content::text(b.get(), Span::detached())))
        }
        (Symbol(a), Content(b)) => {
            Content(crate::types::Content::text(a.get(), Span::detached()).concat(&b))
        }

        (Array(a), Array(b)) => Array(a.concat(&b)),
        (Dict(a), Dict(b)) => Dict(a.merge(&b)),

        (a, b) => return Err(mismatch("add", &a, &b)),
    })
}

/// Computes the difference of two values.
pub fn sub(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(match (lhs, rhs) {
        (Int(a), Int(b)) => Int(a.checked_sub(b).ok_or_else(too_large)?),
        (Int(a), Float(b)) => Float(a as f64 - b),
        (Float(a), Int(b)) => Float(a - b as f64),
        (Float(a), Float(b)) => Float(a - b),

        (Length(a), Length(b)) => Length(a - b),
        (Length(a), Ratio(b)) => Relative(Rel::new(a, -b)),
        (Ratio(a), Length(b)) => Relative(Rel::new(-b, a)),
        (Ratio(a), Ratio(b)) => Ratio(a - b),
        (Relative(a), Length(b)) => Relative(a - Rel::from(b)),
        (Length(a), Relative(b)) => Relative(Rel::from(a) - b),
        (Relative(a), Ratio(b)) => Relative(a - Rel::from(b)),
        (Ratio(a), Relative(b)) => Relative(Rel::from(a) - b),
        (Relative(a), Relative(b)) => Relative(a - b),

        (Angle(a), Angle(b)) => Angle(a - b),
        (Fraction(a), Fraction(b)) => Fraction(a - b),
        (Duration(a), Duration(b)) => Duration(a.checked_sub(b)?),

        (a, b) => return Err(mismatch("subtract", &a, &b)),
    })
}

/// Computes the product of two values.
pub fn mul(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(match (lhs, rhs) {
        (Int(a), Int(b)) => Int(a.checked_mul(b).ok_or_else(too_large)?),
        (Int(a), Float(b)) => Float(a as f64 * b),
        (Float(a), Int(b)) => Float(a * b as f64),
        (Float(a), Float(b)) => Float(a * b),

        (Length(a), Int(b)) => Length(a * b as f64),
        (Length(a), Float(b)) => Length(a * b),
        (Int(a), Length(b)) => Length(b * a as f64),
        (Float(a), Length(b)) => Length(b * a),

        (Angle(a), Int(b)) => Angle(a * b as f64),
        (Angle(a), Float(b)) => Angle(a * b),
        (Int(a), Angle(b)) => Angle(b * a as f64),
        (Float(a), Angle(b)) => Angle(b * a),

        (Ratio(a), Int(b)) => Ratio(a * b as f64),
        (Ratio(a), Float(b)) => Ratio(a * b),
        (Int(a), Ratio(b)) => Ratio(b * a as f64),
        (Float(a), Ratio(b)) => Ratio(b * a),

        (Relative(a), Int(b)) => Relative(a * b as f64),
        (Relative(a), Float(b)) => Relative(a * b),
        (Int(a), Relative(b)) => Relative(b * a as f64),
        (Float(a), Relative(b)) => Relative(b * a),

        (Fraction(a), Int(b)) => Fraction(a * b as f64),
        (Fraction(a), Float(b)) => Fraction(a * b),
        (Int(a), Fraction(b)) => Fraction(b * a as f64),
        (Float(a), Fraction(b)) => Fraction(b * a),

        (Ratio(a), Length(b)) => Length(b * a.value),
        (Length(a), Ratio(b)) => Length(a * b.value),
        (Ratio(a), Angle(b)) => Angle(b * a.value),
        (Angle(a), Ratio(b)) => Angle(a * b.value),
        (Ratio(a), Ratio(b)) => Ratio(crate::geom::Ratio::new(a.value * b.value)),
        (Ratio(a), Relative(b)) => Relative(b * a.value),
        (Relative(a), Ratio(b)) => Relative(a * b.value),
        (Ratio(a), Fraction(b)) => Fraction(b * a.value),
        (Fraction(a), Ratio(b)) => Fraction(a * b.value),

        (Int(a), Duration(b)) => Duration(b.scale(a as f64)),
        (Float(a), Duration(b)) => Duration(b.scale(a)),
        (Duration(a), Int(b)) => Duration(a.scale(b as f64)),
        (Duration(a), Float(b)) => Duration(a.scale(b)),

        (Int(a), Str(b)) => Str(b.repeat(a)?),
        (Str(a), Int(b)) => Str(a.repeat(b)?),
        (Int(a), Array(b)) => Array(b.repeat(a)?),
        (Array(a), Int(b)) => Array(a.repeat(b)?),

        (a, b) => return Err(mismatch("multiply", &a, &b)),
    })
}

/// Computes the quotient of two values.
pub fn div(lhs: Value, rhs: Value) -> StrResult<Value> {
    if is_zero(&rhs) {
        return Err("cannot divide by zero".into());
    }
    Ok(match (lhs, rhs) {
        (Int(a), Int(b)) => Float(a as f64 / b as f64),
        (Int(a), Float(b)) => Float(a as f64 / b),
        (Float(a), Int(b)) => Float(a / b as f64),
        (Float(a), Float(b)) => Float(a / b),

        (Length(a), Int(b)) => Length(a / b as f64),
        (Length(a), Float(b)) => Length(a / b),
        (Angle(a), Int(b)) => Angle(a / b as f64),
        (Angle(a), Float(b)) => Angle(a / b),
        (Ratio(a), Int(b)) => Ratio(a / b as f64),
        (Ratio(a), Float(b)) => Ratio(a / b),
        (Relative(a), Int(b)) => Relative(a / b as f64),
        (Relative(a), Float(b)) => Relative(a / b),
        (Fraction(a), Int(b)) => Fraction(a / b as f64),
        (Fraction(a), Float(b)) => Fraction(a / b),

        (Length(a), Length(b)) => Float(a.pt / b.pt),
        (Angle(a), Angle(b)) => Float(a.rad / b.rad),
        (Ratio(a), Ratio(b)) => Float(a.value / b.value),
        (Fraction(a), Fraction(b)) => Float(a.value / b.value),
        (Duration(a), Duration(b)) => Float(a.ratio(b)?),

        (a, b) => return Err(mismatch("divide", &a, &b)),
    })
}

/// Whether a value is a zero divisor.
fn is_zero(value: &Value) -> bool {
    match value {
        Int(v) => *v == 0,
        Float(v) => *v == 0.0,
        Length(v) => v.is_zero(),
        Angle(v) => v.rad == 0.0,
        Ratio(v) => v.is_zero(),
        Fraction(v) => v.value == 0.0,
        Duration(v) => v.nanos() == 0,
        _ => false,
    }
}

/// Computes whether two values are equal.
pub fn eq(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(equal(&lhs, &rhs)))
}

/// Computes whether two values are unequal.
pub fn neq(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(!equal(&lhs, &rhs)))
}

/// Structural equality of two values.
///
/// Numbers compare across the int/float divide by numeric value. A length and
/// a relative length are equal when the relative's ratio part is zero and the
/// absolute parts match, and mirrored for ratios. `NaN` is unequal to itself.
pub fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (None, None) | (Auto, Auto) => true,
        (Bool(a), Bool(b)) => a == b,
        (Int(a), Int(b)) => a == b,
        (Float(a), Float(b)) => a == b,
        (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
        (Length(a), Length(b)) => a == b,
        (Angle(a), Angle(b)) => a == b,
        (Ratio(a), Ratio(b)) => a == b,
        (Relative(a), Relative(b)) => a == b,
        (Length(a), Relative(b)) | (Relative(b), Length(a)) => {
            b.ratio.is_zero() && *a == b.abs
        }
        (Ratio(a), Relative(b)) | (Relative(b), Ratio(a)) => {
            b.abs.is_zero() && *a == b.ratio
        }
        (Fraction(a), Fraction(b)) => a == b,
        (Duration(a), Duration(b)) => a == b,
        (Version(a), Version(b)) => a == b,
        (Str(a), Str(b)) => a == b,
        (Bytes(a), Bytes(b)) => a == b,
        (Label(a), Label(b)) => a == b,
        (Symbol(a), Symbol(b)) => a == b,
        (Regex(a), Regex(b)) => a == b,
        (Array(a), Array(b)) => {
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|(x, y)| equal(x, y))
        }
        (Dict(a), Dict(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| {
                    b.contains(key) && equal(x, &b.get(key))
                })
        }
        (Content(a), Content(b)) => a == b,
        (Type(a), Type(b)) => a == b,
        (Func(a), Func(b)) => a == b,
        (Module(a), Module(b)) => a == b,
        (Styles(a), Styles(b)) => a == b,
        (Args(a), Args(b)) => a == b,
        _ => false,
    }
}

/// Compares two values for ordering.
///
/// Defined on same-type pairs among booleans, numbers (promoted), strings,
/// lengths, angles, ratios, fractions, durations, versions, and arrays
/// (lexicographically). Everything else cannot be compared.
pub fn compare(lhs: &Value, rhs: &Value) -> StrResult<Ordering> {
    let incomparable = || format!("cannot compare {} and {}", lhs.ty(), rhs.ty());
    match (lhs, rhs) {
        (Bool(a), Bool(b)) => Ok(a.cmp(b)),
        (Int(a), Int(b)) => Ok(a.cmp(b)),
        (Float(a), Float(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Int(a), Float(b)) => (*a as f64).partial_cmp(b).ok_or_else(incomparable),
        (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)).ok_or_else(incomparable),
        (Str(a), Str(b)) => Ok(a.as_str().cmp(b.as_str())),
        (Length(a), Length(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Angle(a), Angle(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Ratio(a), Ratio(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Fraction(a), Fraction(b)) => a.partial_cmp(b).ok_or_else(incomparable),
        (Duration(a), Duration(b)) => Ok(a.cmp(b)),
        (Version(a), Version(b)) => Ok(a.cmp(b)),
        (Array(a), Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                match compare(x, y)? {
                    Ordering::Equal => {}
                    other => return Ok(other),
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => Err(incomparable()),
    }
}

/// Computes whether `lhs` is less than `rhs`.
pub fn lt(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(compare(&lhs, &rhs)? == Ordering::Less))
}

/// Computes whether `lhs` is less than or equal to `rhs`.
pub fn leq(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(compare(&lhs, &rhs)? != Ordering::Greater))
}

/// Computes whether `lhs` is greater than `rhs`.
pub fn gt(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(compare(&lhs, &rhs)? == Ordering::Greater))
}

/// Computes whether `lhs` is greater than or equal to `rhs`.
pub fn geq(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(Bool(compare(&lhs, &rhs)? != Ordering::Less))
}

/// Computes whether `lhs` is contained in `rhs`.
pub fn in_(lhs: Value, rhs: Value) -> StrResult<Value> {
    contains(&lhs, &rhs)
        .map(Bool)
        .ok_or_else(|| mismatch("apply 'in' to", &lhs, &rhs))
}

/// Computes whether `lhs` is not contained in `rhs`.
pub fn not_in(lhs: Value, rhs: Value) -> StrResult<Value> {
    contains(&lhs, &rhs)
        .map(|contained| Bool(!contained))
        .ok_or_else(|| mismatch("apply 'not in' to", &lhs, &rhs))
}

/// The containment test backing `in` and `not in`, when defined.
fn contains(lhs: &Value, rhs: &Value) -> Option<bool> {
    match (lhs, rhs) {
        (Str(a), Str(b)) => Some(b.contains(a.as_str())),
        (Str(a), Dict(b)) => Some(b.contains(a.as_str())),
        (a, Array(b)) => Some(b.contains(a)),
        _ => Option::None,
    }
}

/// Joins two values, as used to combine sequential statement values in code
/// and content blocks.
///
/// `none` joins to the other side. Strings, symbols, and content join
/// textually (a string joined with content promotes to content). Arrays
/// concatenate and dictionaries merge with a right bias.
pub fn join(lhs: Value, rhs: Value) -> StrResult<Value> {
    Ok(match (lhs, rhs) {
        (a, None) => a,
        (None, b) => b,
        (Str(a), Str(b)) => Str(a.concat(&b)),
        (Str(a), Symbol(b)) => Str(a.concat(&b.get().to_string())),
        (Symbol(a), Str(b)) => Str(crate::types::Str::from(a.get()).concat(&b)),
        (Symbol(a), Symbol(b)) => {
            let mut buf = std::string::String::new();
            buf.push(a.get());
            buf.push(b.get());
            Str(buf.into())
        }
        (Content(a), Content(b)) => Content(a.concat(&b)),
        (Content(a), Str(b)) => {
            Content(a.concat(&crate::types::Content::text(b, Span::detached())))
        }
        (Str(a), Content(b)) => {
            Content(crate::types::Content::text(a, Span::detached()).concat(&b))
        }
        (Content(a), Symbol(b)) => {
            Content(a.concat(&crate::types::Content::text(b.get(), Span::detached())))
        }
        (Symbol(a), Content(b)) => {
            Content(crate::types::Content::text(a.get(), Span::detached()).concat(&b))
        }
        (Array(a), Array(b)) => Array(a.concat(&b)),
        (Dict(a), Dict(b)) => Dict(a.merge(&b)),
        (a, b) => return Err(format!("cannot join {} with {}", a.ty(), b.ty())),
    })
}

/// The overflow error message.
fn too_large() -> String {
    "value is too large".into()
}

/// Formats a `cannot <op> T and U` error.
fn mismatch(op: &str, lhs: &Value, rhs: &Value) -> String {
    format!("cannot {op} {} and {}", lhs.ty(), rhs.ty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom;

    #[test]
    fn none_is_additive_identity() {
        assert_eq!(add(None, Int(5)).unwrap(), Int(5));
        assert_eq!(add(Int(5), None).unwrap(), Int(5));
    }

    #[test]
    fn int_overflow_signals_too_large() {
        assert_eq!(add(Int(i64::MAX), Int(1)).unwrap_err(), "value is too large");
        assert_eq!(neg(Int(i64::MIN)).unwrap_err(), "value is too large");
        assert_eq!(mul(Int(i64::MAX), Int(2)).unwrap_err(), "value is too large");
    }

    #[test]
    fn length_and_ratio_compose_to_relative() {
        let rel = add(
            Length(geom::Length::pt(10.0)),
            Ratio(geom::Ratio::percent(20.0)),
        )
        .unwrap();
        let Relative(rel) = rel else { panic!("expected relative length") };
        assert_eq!(rel.abs.pt, 10.0);
        assert_eq!(rel.ratio.value, 0.2);
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(div(Int(1), Int(0)).unwrap_err(), "cannot divide by zero");
        assert_eq!(div(Float(1.0), Float(0.0)).unwrap_err(), "cannot divide by zero");
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert!(!equal(&Float(f64::NAN), &Float(f64::NAN)));
        assert!(compare(&Float(f64::NAN), &Float(1.0)).is_err());
    }

    #[test]
    fn numeric_cross_type_equality() {
        assert!(equal(&Int(2), &Float(2.0)));
        assert!(!equal(&Int(2), &Float(2.5)));
    }

    #[test]
    fn length_equals_relative_with_zero_ratio() {
        let len = Length(geom::Length::pt(7.0));
        let rel = Relative(Rel::from(geom::Length::pt(7.0)));
        assert!(equal(&len, &rel));
        let mixed = Relative(Rel::new(geom::Length::pt(7.0), geom::Ratio::new(0.1)));
        assert!(!equal(&len, &mixed));
    }

    #[test]
    fn negative_repeat_count_fails() {
        assert!(mul(Int(-1), Str("ab".into())).is_err());
        assert!(mul(Str("ab".into()), Int(2)).is_ok());
    }

    #[test]
    fn array_compare_is_lexicographic() {
        let a = crate::types::Array::from_vec(vec![Int(1), Int(2)]);
        let b = crate::types::Array::from_vec(vec![Int(1), Int(3)]);
        assert_eq!(compare(&Array(a.clone()), &Array(b)).unwrap(), Ordering::Less);
        let prefix = crate::types::Array::from_vec(vec![Int(1)]);
        assert_eq!(compare(&Array(prefix), &Array(a)).unwrap(), Ordering::Less);
    }

    #[test]
    fn join_rules() {
        assert_eq!(join(None, Int(3)).unwrap(), Int(3));
        assert_eq!(join(Int(3), None).unwrap(), Int(3));
        assert_eq!(
            join(Str("a".into()), Str("b".into())).unwrap(),
            Str("ab".into())
        );
        assert_eq!(
            join(Int(1), Int(2)).unwrap_err(),
            "cannot join integer with integer"
        );
    }

    #[test]
    fn string_in_string_is_substring_test() {
        assert_eq!(in_(Str("ell".into()), Str("hello".into())).unwrap(), Bool(true));
        assert_eq!(
            not_in(Str("xyz".into()), Str("hello".into())).unwrap(),
            Bool(true)
        );
    }
}
