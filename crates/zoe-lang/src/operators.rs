//! Value semantics of the machine's built-in operators.
//!
//! Numbers and numeric text combine arithmetically. Once either operand is
//! text that does not read as a number, the string forms apply.

use rand::{Rng, RngCore};

use crate::ast::Operator;
use crate::geometry::Torus;
use crate::literal::Literal;

/// Result of a binary operator.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// Replace the left operand with this value.
    Replace(Literal),
    /// Keep the left operand and push these values above it.
    Extend(Vec<Literal>),
}

pub(crate) fn binary(op: Operator, left: &Literal, right: &Literal, torus: Torus) -> Outcome {
    let numbers = left.numeric().zip(right.numeric());
    let replace = match op {
        Operator::And => Literal::truth(left.is_true() && right.is_true()),
        Operator::Or => Literal::truth(left.is_true() || right.is_true()),
        Operator::Equals => match numbers {
            Some((l, r)) => Literal::truth(l == r),
            None => Literal::truth(left.to_string() == right.to_string()),
        },
        Operator::LessThan => match numbers {
            Some((l, r)) => Literal::truth(l < r),
            None => Literal::truth(left.to_string() < right.to_string()),
        },
        Operator::GreaterThan => match numbers {
            Some((l, r)) => Literal::truth(l > r),
            None => Literal::truth(left.to_string() > right.to_string()),
        },
        Operator::Plus => match numbers {
            Some((l, r)) => Literal::Number(l + r),
            None => Literal::Text(format!("{left}{right}")),
        },
        Operator::Minus => minus(left, right, torus),
        Operator::Times => return times(left, right),
        Operator::DividedBy => divided_by(left, right),
        Operator::Modulus => modulus(left, right),
        _ => left.clone(),
    };
    Outcome::Replace(replace)
}

fn minus(left: &Literal, right: &Literal, torus: Torus) -> Literal {
    if let (Some(a), Some(b)) = (left.as_point(), right.as_point()) {
        return Literal::Number(torus.range(a, b));
    }
    match (left.as_plain_text(), right.as_plain_text(), right.numeric()) {
        (Some(text), None, Some(n)) => Literal::Text(drop_last(text, count_of(n))),
        (Some(text), Some(suffix), _) => {
            Literal::Text(text.strip_suffix(suffix).unwrap_or(text).to_owned())
        }
        _ => Literal::Number(left.to_number() - right.to_number()),
    }
}

fn times(left: &Literal, right: &Literal) -> Outcome {
    match (left.as_plain_text(), right.as_plain_text()) {
        (Some(text), Some(delimiter)) => {
            let mut pushed: Vec<Literal> = text
                .split(delimiter)
                .filter(|token| !token.is_empty())
                .map(Literal::from)
                .collect();
            pushed.push(Literal::Number(pushed.len() as f64));
            Outcome::Extend(pushed)
        }
        (Some(text), None) => Outcome::Replace(nth_token(text, right.to_number())),
        (None, Some(text)) => Outcome::Replace(nth_token(text, left.to_number())),
        (None, None) => Outcome::Replace(Literal::Number(left.to_number() * right.to_number())),
    }
}

fn divided_by(left: &Literal, right: &Literal) -> Literal {
    match (left.as_plain_text(), right.as_plain_text()) {
        (Some(text), None) => {
            let n = right.to_number();
            if n == 0.0 {
                return Literal::ZERO;
            }
            let keep = (text.chars().count() as f64 / n.abs()).floor() as usize;
            Literal::Text(text.chars().take(keep).collect())
        }
        (None, Some(text)) => {
            let n = left.to_number();
            if n == 0.0 {
                return Literal::ZERO;
            }
            Literal::Text(nth_char(text, n))
        }
        _ => {
            let r = right.to_number();
            if r == 0.0 {
                Literal::ZERO
            } else {
                Literal::Number(left.to_number() / r)
            }
        }
    }
}

fn modulus(left: &Literal, right: &Literal) -> Literal {
    let r = right.to_number();
    if r == 0.0 {
        return Literal::ZERO;
    }
    match (left.as_plain_text(), right.as_plain_text()) {
        (Some(text), None) => {
            let len = text.chars().count();
            let keep = count_of(r).min(len);
            Literal::Text(text.chars().skip(len - keep).collect())
        }
        _ => Literal::Number(left.to_number() % r),
    }
}

pub(crate) fn not(value: &Literal) -> Literal {
    Literal::truth(!value.is_true())
}

pub(crate) fn negate(value: &Literal) -> Literal {
    match value.as_plain_text() {
        Some(text) => Literal::Text(text.chars().rev().collect()),
        None => Literal::Number(-value.to_number()),
    }
}

pub(crate) fn absolute(value: &Literal) -> Literal {
    match value.as_plain_text() {
        Some(text) => Literal::Number(text.chars().count() as f64),
        None => Literal::Number(value.to_number().abs()),
    }
}

/// Integral moduli give a uniform integer in `[0, |m|)` carrying the sign
/// of `m`; fractional ones scale a uniform real; text yields a random
/// substring.
pub(crate) fn random(modulus: &Literal, rng: &mut dyn RngCore) -> Literal {
    if let Some(text) = modulus.as_plain_text() {
        let chars: Vec<char> = text.chars().collect();
        let start = rng.random_range(0..=chars.len());
        let end = rng.random_range(start..=chars.len());
        return Literal::Text(chars[start..end].iter().collect());
    }
    let m = modulus.to_number();
    if m == 0.0 || !m.is_finite() {
        return Literal::ZERO;
    }
    if m.fract() == 0.0 {
        let bound = m.abs().min(i64::MAX as f64) as i64;
        let draw = rng.random_range(0..bound) as f64;
        Literal::Number(if m < 0.0 { -draw } else { draw })
    } else {
        Literal::Number(rng.random::<f64>() * m)
    }
}

fn count_of(n: f64) -> usize {
    if n.is_finite() { n.abs() as usize } else { 0 }
}

fn drop_last(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().take(len.saturating_sub(n)).collect()
}

fn nth_token(text: &str, n: f64) -> Literal {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Literal::Text(String::new());
    }
    let index = (n as i64).rem_euclid(tokens.len() as i64) as usize;
    Literal::from(tokens[index])
}

fn nth_char(text: &str, n: f64) -> String {
    let Some(index) = count_of(n).checked_sub(1) else {
        return String::new();
    };
    let picked = if n > 0.0 {
        text.chars().nth(index)
    } else {
        text.chars().rev().nth(index)
    };
    picked.map(String::from).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    const TORUS: Torus = Torus::new(100.0, 100.0);

    fn apply(op: Operator, left: impl Into<Literal>, right: impl Into<Literal>) -> Literal {
        match binary(op, &left.into(), &right.into(), TORUS) {
            Outcome::Replace(value) => value,
            Outcome::Extend(_) => panic!("unexpected extend"),
        }
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(apply(Operator::DividedBy, 7.0, 0.0), Literal::ZERO);
        assert_eq!(apply(Operator::Modulus, 7.0, 0.0), Literal::ZERO);
        assert_eq!(apply(Operator::DividedBy, "abc", 0.0), Literal::ZERO);
    }

    #[test]
    fn numeric_text_is_arithmetic() {
        assert_eq!(apply(Operator::Plus, "2", 3.0), Literal::Number(5.0));
        assert_eq!(apply(Operator::Plus, "ab", 3.0), Literal::from("ab3"));
    }

    #[test]
    fn minus_on_points_is_toroidal_range() {
        let a = crate::geometry::Point::new(1.0, 50.0);
        let b = crate::geometry::Point::new(97.0, 50.0);
        assert_eq!(apply(Operator::Minus, a, b), Literal::Number(4.0));
        assert_eq!(apply(Operator::Minus, "hello", 2.0), Literal::from("hel"));
    }

    #[test]
    fn string_slicing() {
        assert_eq!(apply(Operator::DividedBy, "abcdef", 2.0), Literal::from("abc"));
        assert_eq!(apply(Operator::DividedBy, 2.0, "abcdef"), Literal::from("b"));
        assert_eq!(apply(Operator::DividedBy, -1.0, "abcdef"), Literal::from("f"));
        assert_eq!(apply(Operator::Modulus, "abcdef", 2.0), Literal::from("ef"));
        assert_eq!(apply(Operator::Times, "go left now", 1.0), Literal::from("left"));
        assert_eq!(apply(Operator::Times, "go left now", -1.0), Literal::from("now"));
    }

    #[test]
    fn times_explodes_on_delimiter() {
        let outcome = binary(
            Operator::Times,
            &Literal::from("a,b,c"),
            &Literal::from(","),
            TORUS,
        );
        assert_eq!(
            outcome,
            Outcome::Extend(vec![
                Literal::from("a"),
                Literal::from("b"),
                Literal::from("c"),
                Literal::Number(3.0),
            ])
        );
    }

    #[test]
    fn random_respects_sign_and_bounds() {
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        for _ in 0..100 {
            let n = random(&Literal::Number(-5.0), &mut rng).to_number();
            assert!(n <= 0.0 && n > -5.0 && n.fract() == 0.0);
            let r = random(&Literal::Number(0.5), &mut rng).to_number();
            assert!((0.0..0.5).contains(&r));
        }
        assert_eq!(random(&Literal::ZERO, &mut rng), Literal::ZERO);
    }

    #[test]
    fn unary_string_forms() {
        assert_eq!(negate(&Literal::from("abc")), Literal::from("cba"));
        assert_eq!(absolute(&Literal::from("abc")), Literal::Number(3.0));
        assert_eq!(absolute(&Literal::Number(-2.0)), Literal::Number(2.0));
        assert_eq!(not(&Literal::from("")), Literal::truth(true));
    }
}
