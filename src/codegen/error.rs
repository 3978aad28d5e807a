use thiserror::Error;

use crate::backend::BackendError;
use crate::codegen::ir::ValueKind;

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("Unknown variable name: {name}")]
    UnknownVariable { name: String },
    #[error("Undefined variable: {name}")]
    UndefinedAssignment { name: String },
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },
    #[error("Invalid binary operator '{op}'")]
    InvalidBinaryOperator { op: &'static str },
    #[error("Invalid unary operator '{op}'")]
    InvalidUnaryOperator { op: &'static str },
    #[error("Invalid operand for '{op}': {kind}")]
    InvalidOperand { op: &'static str, kind: ValueKind },
    #[error("Cannot assign {found} value to {expected} variable '{name}'")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}
