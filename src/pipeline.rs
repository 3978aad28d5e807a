//! Source-to-execution entry points shared by the CLI, the integration
//! harness and the benchmarks.

use thiserror::Error;

use crate::ast::Program;
use crate::backend::BackendError;
use crate::backend::jit::{Execution, Jit, JitOptions, PreparedJit};
use crate::backend::trace::Trace;
use crate::codegen::LoweringError;
use crate::lexer::tokenize;
use crate::parser::{SyntaxError, parse_tokens};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Lexes and parses `source`. Lexer diagnostics are logged, not returned.
pub fn parse_source(source: &str) -> Result<Program, SyntaxError> {
    parse_tokens(tokenize(source))
}

pub fn compile(source: &str, options: JitOptions) -> Result<PreparedJit, CompileError> {
    let program = parse_source(source)?;
    Ok(Jit::with_options(options).compile(&program)?)
}

/// Compiles and executes `source` once.
pub fn run(source: &str) -> Result<Execution, CompileError> {
    let prepared = compile(source, JitOptions::default())?;
    Ok(prepared.execute()?)
}

/// Recorded operation listing for `source`.
pub fn trace(source: &str) -> Result<String, CompileError> {
    let program = parse_source(source)?;
    Ok(Trace.record(&program)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_reports_output_and_status() {
        let execution = run("cook { yap(\"hello\", 1); }").expect("run failed");
        assert_eq!(execution.output, "hello1\n");
        assert_eq!(execution.status, 0);
    }

    #[test]
    fn errors_keep_their_stage() {
        assert!(matches!(run("cook {"), Err(CompileError::Syntax(_))));
        assert!(matches!(
            run("cook { yap(x); }"),
            Err(CompileError::Lowering(LoweringError::UnknownVariable { .. }))
        ));
    }

    #[test]
    fn trace_does_not_execute() {
        let listing = trace("cook { yap(1); }").expect("trace failed");
        assert!(listing.contains("print \"%d\\n\", v0"));
    }
}
