use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use brainrot::backend::Backend;
use brainrot::backend::jit::{Jit, JitOptions};
use brainrot::backend::trace::Trace;
use brainrot::pipeline;

#[derive(Parser)]
#[command(name = "brainrot", version)]
#[command(about = "Compile and run brainrot programs")]
struct Args {
    /// Path to the source file
    file: PathBuf,

    /// Code generator to drive
    #[arg(long, value_enum, default_value_t = BackendKind::Jit)]
    backend: BackendKind,

    /// Print the generated Cranelift IR to stderr
    #[arg(long)]
    dump_ir: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Compile to native code and run it
    Jit,
    /// Print the lowered operations without running
    Trace,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Reading {}", args.file.display()))?;
    let program = pipeline::parse_source(&source)?;

    let backend: Box<dyn Backend> = match args.backend {
        BackendKind::Jit => Box::new(Jit::with_options(JitOptions {
            dump_ir: args.dump_ir,
        })),
        BackendKind::Trace => Box::new(Trace),
    };
    let output = backend.run(&program)?;
    if !output.is_empty() {
        print!("{output}");
    }
    Ok(())
}
