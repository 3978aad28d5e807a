use anyhow::Result;

use crate::ast::Program;

pub mod error;
pub mod jit;
pub mod trace;

pub use error::BackendError;

/// Executable artifact produced by a backend `prepare` step.
///
/// Compilation and execution stay separate so benchmarks and tests can
/// measure and validate the two phases independently.
pub trait PreparedBackend {
    fn run(&self) -> Result<String>;
}

/// Common interface implemented by each code generator.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>>;

    fn run(&self, program: &Program) -> Result<String> {
        self.prepare(program)?.run()
    }
}

pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![Box::new(jit::Jit::new()), Box::new(trace::Trace)]
}
