//! Recoverable error conditions.
//!
//! Invariant violations inside the engine (dereferencing an unknown node id,
//! resolving two bounds of the same kind) are bugs and panic instead.

use thiserror::Error;

/// Errors reported by the XADD engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XaddError {
    /// A test is not a linear inequality (non-linear term, `=` relation, no variables).
    #[error("invalid test: {0}")]
    InvalidTest(String),

    /// A test or expression references a variable that was never declared.
    #[error("undeclared variable `{0}`")]
    UndeclaredVariable(String),

    /// A variable was declared twice with different domains.
    #[error("variable `{0}` is already declared with a different domain")]
    VariableRedeclared(String),

    /// Evaluation reached a variable missing from the assignment.
    #[error("variable `{0}` is not assigned")]
    UnassignedVariable(String),

    /// A boolean operator met a leaf that is not a constant.
    #[error("terminal `{0}` is not a boolean constant")]
    NonBooleanTerminal(String),

    /// Elimination needs a bound the diagram and the domain do not provide.
    #[error("variable `{0}` has no {1} bound on a path with a non-zero leaf")]
    UnboundedVariable(String, &'static str),

    /// Discrete elimination met a bound that is not integral in the eliminated variable.
    #[error("test `{test}` does not give an integral bound on discrete variable `{var}`")]
    NonIntegralBound { var: String, test: String },

    /// Matrix operands have incompatible row/column variables.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Expression text could not be parsed.
    #[error("parse error at {position}: {message}")]
    Parse { position: usize, message: String },
}

pub type Result<T> = std::result::Result<T, XaddError>;
