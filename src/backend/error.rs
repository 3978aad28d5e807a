use cranelift_module::ModuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("entry function was never opened")]
    MissingEntry,
    #[error("formatted output used before the print routine was declared")]
    PrintNotDeclared,
    #[error("string literal contains a NUL byte")]
    EmbeddedNul,
    #[error("runtime error: {0}")]
    Runtime(String),
}
