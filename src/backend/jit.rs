use anyhow::Result;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use tracing::{debug, info};

use crate::ast::Program;
use crate::backend::{Backend, BackendError, PreparedBackend};
use crate::codegen::{self, LoweringError};

mod emitter;
mod runtime;

pub use emitter::JitBackend;
pub use runtime::Execution;

use runtime::{EntryFn, Runtime};

const ENTRY_SYMBOL: &str = "brainrot_main";

#[derive(Debug, Clone, Copy, Default)]
pub struct JitOptions {
    /// Print the finalized Cranelift IR to stderr.
    pub dump_ir: bool,
}

#[derive(Debug, Default)]
pub struct Jit {
    options: JitOptions,
}

/// Native code for one program. Owns the module so the code stays mapped.
pub struct PreparedJit {
    _module: JITModule,
    entry: EntryFn,
}

impl Jit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: JitOptions) -> Self {
        Self { options }
    }

    pub fn compile(&self, program: &Program) -> Result<PreparedJit, LoweringError> {
        let mut builder = JITBuilder::new(cranelift_module::default_libcall_names())
            .map_err(BackendError::from)?;
        runtime::register_runtime_symbols(&mut builder);

        let mut module = JITModule::new(builder);
        let ptr_type = module.target_config().pointer_type();
        let sig = emitter::entry_signature(&module, ptr_type);
        let entry_id = module
            .declare_function(ENTRY_SYMBOL, Linkage::Local, &sig)
            .map_err(BackendError::from)?;

        let mut ctx = module.make_context();
        ctx.func.signature = sig;
        let mut builder_ctx = FunctionBuilderContext::new();
        {
            let builder = FunctionBuilder::new(&mut ctx.func, &mut builder_ctx);
            let mut backend = JitBackend::new(&mut module, builder);
            codegen::lower(program, &mut backend)?;
            backend.finish()?;
        }

        if self.options.dump_ir {
            eprintln!("; ---- CLIF {ENTRY_SYMBOL} ----");
            eprintln!("{}", ctx.func.display());
        }
        module
            .define_function(entry_id, &mut ctx)
            .map_err(BackendError::from)?;
        module.clear_context(&mut ctx);
        module.finalize_definitions().map_err(BackendError::from)?;
        debug!("entry function finalized");

        let entry = module.get_finalized_function(entry_id);
        // SAFETY: the function was declared with `entry_signature`.
        let entry: EntryFn = unsafe { std::mem::transmute(entry) };
        Ok(PreparedJit {
            _module: module,
            entry,
        })
    }
}

impl PreparedJit {
    /// Runs the entry function against a fresh runtime.
    pub fn execute(&self) -> Result<Execution, BackendError> {
        let mut runtime = Runtime::new();
        let status = (self.entry)(&mut runtime as *mut Runtime);
        let execution = runtime.finish(status)?;
        info!("program finished with code {}", execution.status);
        Ok(execution)
    }
}

impl Backend for Jit {
    fn name(&self) -> &'static str {
        "jit"
    }

    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>> {
        Ok(Box::new(self.compile(program)?))
    }
}

impl PreparedBackend for PreparedJit {
    fn run(&self) -> Result<String> {
        Ok(self.execute()?.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn run_source(source: &str) -> Execution {
        let program = parse_tokens(tokenize(source)).expect("parse failed");
        Jit::new()
            .compile(&program)
            .expect("compile failed")
            .execute()
            .expect("execution failed")
    }

    #[test]
    fn prints_a_declared_variable() {
        let execution = run_source("cook { pookie x = 5; yap(x); }");
        assert_eq!(execution.output, "5\n");
        assert_eq!(execution.status, 0);
    }

    #[test]
    fn prints_floats_with_six_decimals() {
        assert_eq!(run_source("cook { yap(1.5); }").output, "1.500000\n");
        assert_eq!(run_source("cook { yap(6 / 4); }").output, "1.500000\n");
        assert_eq!(run_source("cook { yap(1 + 0.25); }").output, "1.250000\n");
    }

    #[test]
    fn demoted_literal_prints_as_integer() {
        assert_eq!(run_source("cook { yap(7.0); }").output, "7\n");
    }

    #[test]
    fn mixes_strings_and_numbers() {
        let execution = run_source(r#"cook { pookie n = 3; yap("n = ", n, ", half = ", n / 2); }"#);
        assert_eq!(execution.output, "n = 3, half = 1.500000\n");
    }

    #[test]
    fn if_else_takes_one_branch() {
        let source = indoc! {r#"
            cook {
                pookie x = 3;
                fr (x > 2) {
                    yap("big");
                } cap {
                    yap("small");
                }
                no_cap (x < 2) {
                    yap("tiny");
                } cap {
                    yap("not tiny");
                }
            }
        "#};
        assert_eq!(run_source(source).output, "big\nnot tiny\n");
    }

    #[test]
    fn float_condition_tests_against_zero() {
        let source = "cook { fr (0.0 + 0.5) { yap(1); } cap { yap(0); } }";
        assert_eq!(run_source(source).output, "1\n");
    }

    #[test]
    fn loop_runs_until_condition_fails() {
        let source = indoc! {"
            cook {
                bet (pookie i = 0, i < 5, i = i + 1) {
                    yap(i);
                }
            }
        "};
        assert_eq!(run_source(source).output, "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn loop_with_false_condition_never_runs_body() {
        let source = "cook { bet (pookie i = 0, i < 0, i = i + 1) { yap(i); } yap(\"done\"); }";
        assert_eq!(run_source(source).output, "done\n");
    }

    #[test]
    fn assignment_converts_to_slot_kind() {
        let source = indoc! {"
            cook {
                pookie x = 0.5;
                bet (x = 2, x < 0, x = x + 1) { }
                yap(x);
                pookie n = 1;
                bet (n = 2.9, n < 0, n = n + 1) { }
                yap(n);
            }
        "};
        assert_eq!(run_source(source).output, "2.000000\n2\n");
    }

    #[test]
    fn comparisons_and_negation_print_as_integers() {
        let source = "cook { yap(1 < 2, 2 == 3, 4 > 5, -4); }";
        assert_eq!(run_source(source).output, "100-4\n");
    }

    #[test]
    fn not_equal_fails_to_compile() {
        let program = parse_tokens(tokenize("cook { yap(2 != 3); }")).expect("parse failed");
        let err = Jit::new().compile(&program).err().expect("should fail");
        assert_eq!(err.to_string(), "Invalid binary operator '!='");
    }

    #[test]
    fn string_with_nul_byte_fails_to_compile() {
        let program = parse_tokens(tokenize("cook { yap(\"a\0b\"); }")).expect("parse failed");
        let err = Jit::new().compile(&program).err().expect("should fail");
        assert!(matches!(
            err,
            LoweringError::Backend(BackendError::EmbeddedNul)
        ));
        assert_eq!(err.to_string(), "string literal contains a NUL byte");
    }

    #[test]
    fn each_execution_gets_fresh_output() {
        let program = parse_tokens(tokenize("cook { yap(\"hi\"); }")).expect("parse failed");
        let prepared = Jit::new().compile(&program).expect("compile failed");
        assert_eq!(prepared.execute().expect("first run").output, "hi\n");
        assert_eq!(prepared.execute().expect("second run").output, "hi\n");
    }

    #[test]
    fn lowering_errors_abort_compilation() {
        let program = parse_tokens(tokenize("cook { yap(y); }")).expect("parse failed");
        let err = Jit::new().compile(&program).err().expect("should fail");
        assert_eq!(err.to_string(), "Unknown variable name: y");
    }
}
