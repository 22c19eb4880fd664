use alloc::{string::String, vec::Vec};
use core::{error::Error, fmt::Display};

use crate::entity::TypingError;

pub type EvalResult<T> = Result<T, EvaluationError>;

/// Contract violations raised while evaluating expressions or applying effects.
///
/// Undefined and Unknown *results* of pure evaluation are values,
/// see [fuzzy](crate::fuzzy). These errors are for places where
/// such values cannot be accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Evaluation reached a variable without a binding.
    Binding { variable: String },
    /// An effect head or body evaluated to Undefined.
    UndefinedExpression { expression: String },
    /// An effect head or body evaluated to Unknown.
    UnknownExpression { expression: String },
    /// Arithmetic produced NaN or an infinity.
    Numeric {
        operator: &'static str,
        operands: Vec<f64>,
    },
    /// A defined formula was re-entered with the same arguments
    /// before its evaluation finished.
    Cycle { formula: String },
    Typing(TypingError),
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Binding { variable } => write!(f, "variable {} is not bound", variable),
            Self::UndefinedExpression { expression } => {
                write!(f, "expression {} is undefined", expression)
            }
            Self::UnknownExpression { expression } => {
                write!(f, "expression {} is unknown", expression)
            }
            Self::Numeric { operator, operands } => {
                write!(f, "illegal arithmetic ({}", operator)?;
                for o in operands {
                    write!(f, " {}", o)?;
                }
                write!(f, ")")
            }
            Self::Cycle { formula } => write!(f, "cycle while evaluating {}", formula),
            Self::Typing(e) => write!(f, "{:?}", e),
        }
    }
}

impl Error for EvaluationError {}

impl From<TypingError> for EvaluationError {
    fn from(value: TypingError) -> Self {
        Self::Typing(value)
    }
}

/// Errors while assembling expressions and actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
    TypeMismatch {
        name: String,
        position: usize,
    },
    UnknownName(String),
    /// The ground instances of a signature do not fit in an ID interval.
    TooManyInstances(String),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for BuildError {}
