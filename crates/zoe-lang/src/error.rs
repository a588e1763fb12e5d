use thiserror::Error;

/// Malformed Zoel source text.
///
/// Positions are 1-based. `found` is the offending token as written and
/// `expected` names the construct the parser was looking for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub found: String,
    pub expected: String,
}

impl SyntaxError {
    pub fn new(
        line: usize,
        column: usize,
        found: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            found: found.into(),
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
