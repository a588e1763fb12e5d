use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Point;

/// Runtime value of the operand stack: a double or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Default for Literal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Literal {
    pub const ZERO: Literal = Literal::Number(0.0);

    #[must_use]
    pub fn truth(value: bool) -> Self {
        Self::Number(if value { 1.0 } else { 0.0 })
    }

    /// Numbers are true when non-zero, strings when non-empty.
    #[must_use]
    pub fn is_true(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric reading of the value; unparseable text reads as zero.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        self.numeric().unwrap_or(0.0)
    }

    /// Numeric reading when the value is a number or numeric text.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Text that does not read as a number.
    #[must_use]
    pub fn as_plain_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if self.numeric().is_none() => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Text(s) => Point::parse(s),
            Self::Number(_) => None,
        }
    }

    /// Whole numbers render without a fraction, others at full precision.
    #[must_use]
    pub fn format_number(n: f64) -> String {
        if n.is_finite() && n.fract() == 0.0 {
            format!("{n:.0}")
        } else {
            format!("{n}")
        }
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::truth(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Point> for Literal {
    fn from(value: Point) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&Self::format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}
