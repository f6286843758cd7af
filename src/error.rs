//! Runtime faults raised during resolution.
//!
//! A fault aborts the whole search unless an enclosing `catch/3` intercepts
//! it. For that purpose every fault can be lowered to a ball term in the
//! conventional shape and unified against a catcher pattern.

use std::fmt;

use crate::term::Term;

/// A fault raised while solving a goal.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// An argument was an unbound variable where a bound term is required.
    Instantiation,
    /// An argument had the wrong shape for the operation.
    TypeMismatch { expected: &'static str, found: Term },
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// Arithmetic evaluation left the 64-bit integer range.
    Overflow,
    /// A term thrown by `throw/1`, carried verbatim.
    Ball(Term),
}

impl RuntimeError {
    /// The ball term a `catch/3` catcher is unified against.
    pub fn to_ball(&self) -> Term {
        match self {
            RuntimeError::Instantiation => Term::atom("instantiation_error"),
            RuntimeError::TypeMismatch { expected, found } => Term::compound(
                "type_error",
                vec![Term::atom(*expected), found.clone()],
            ),
            RuntimeError::DivisionByZero => Term::compound(
                "evaluation_error",
                vec![Term::atom("zero_divisor")],
            ),
            RuntimeError::Overflow => Term::compound(
                "evaluation_error",
                vec![Term::atom("int_overflow")],
            ),
            RuntimeError::Ball(term) => term.clone(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Instantiation => {
                write!(f, "arguments are not sufficiently instantiated")
            }
            RuntimeError::TypeMismatch { expected, found } => {
                write!(f, "type error: expected {}, found {}", expected, found)
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::Overflow => write!(f, "integer overflow"),
            RuntimeError::Ball(term) => write!(f, "uncaught exception: {}", term),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_shapes() {
        assert_eq!(
            RuntimeError::Instantiation.to_ball(),
            Term::atom("instantiation_error")
        );
        assert_eq!(
            RuntimeError::TypeMismatch {
                expected: "evaluable",
                found: Term::atom("foo"),
            }
            .to_ball(),
            Term::compound("type_error", vec![Term::atom("evaluable"), Term::atom("foo")])
        );
        assert_eq!(
            RuntimeError::DivisionByZero.to_ball(),
            Term::compound("evaluation_error", vec![Term::atom("zero_divisor")])
        );
        assert_eq!(
            RuntimeError::Overflow.to_ball(),
            Term::compound("evaluation_error", vec![Term::atom("int_overflow")])
        );
        let ball = Term::compound("my_error", vec![Term::Int(1)]);
        assert_eq!(RuntimeError::Ball(ball.clone()).to_ball(), ball);
    }

    #[test]
    fn test_display() {
        let e = RuntimeError::TypeMismatch {
            expected: "integer",
            found: Term::atom("a"),
        };
        assert_eq!(e.to_string(), "type error: expected integer, found a");
        assert_eq!(
            RuntimeError::Ball(Term::atom("boom")).to_string(),
            "uncaught exception: boom"
        );
    }
}
