use anyhow::{Context, Result, ensure};
use std::path::Path;

use brainrot::pipeline::{self, CompileError};
use test_support::{Case, CaseClass, load_cases, normalize_output, run_cli};

const PROGRAMS_DIR: &str = "tests/programs";

fn check_case(case: &Case) -> Result<()> {
    let source = case.source()?;
    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            ensure!(
                case.spec.expected.exit_code == 0,
                "Case {} expected exit code must be 0 for runtime_success",
                case.name
            );
            let expected = case.expected_stdout()?;
            let execution =
                pipeline::run(&source).with_context(|| format!("Running {}", case.name))?;
            assert_eq!(
                normalize_output(&execution.output),
                normalize_output(&expected),
                "Output mismatch for {}",
                case.name
            );
            assert_eq!(execution.status, 0, "Status mismatch for {}", case.name);
        }
        CaseClass::SyntaxError | CaseClass::LoweringError => {
            ensure!(
                case.spec.expected.exit_code == 1,
                "Case {} expected exit code must be 1 for failing cases",
                case.name
            );
            let expected_error = case.expected_error()?;
            let error = match pipeline::run(&source) {
                Ok(_) => anyhow::bail!("Expected {} to fail", case.name),
                Err(error) => error,
            };
            let stage_matches = match case.spec.class {
                CaseClass::SyntaxError => matches!(error, CompileError::Syntax(_)),
                _ => matches!(error, CompileError::Lowering(_)),
            };
            ensure!(
                stage_matches,
                "Case {} failed in the wrong stage: {error:?}",
                case.name
            );
            let actual = error.to_string();
            ensure!(
                actual.contains(&expected_error),
                "Expected error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
    }
    Ok(())
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new(PROGRAMS_DIR))?;
    for case in &cases {
        if case.spec.bench.enabled {
            ensure!(
                !case.spec.bench.tags.is_empty(),
                "Case {} has bench enabled but no tags",
                case.name
            );
        }
        check_case(case)?;
    }
    Ok(())
}

#[test]
fn cli_matches_fixture_expectations() -> Result<()> {
    let binary = Path::new(env!("CARGO_BIN_EXE_brainrot"));
    for case in load_cases(Path::new(PROGRAMS_DIR))? {
        let output = run_cli(binary, &case.program_path, &[])?;
        assert_eq!(
            output.exit_code, case.spec.expected.exit_code,
            "Exit code mismatch for {}: {}",
            case.name, output.stderr
        );
        match case.spec.class {
            CaseClass::RuntimeSuccess => assert_eq!(
                normalize_output(&output.stdout),
                normalize_output(&case.expected_stdout()?),
                "CLI output mismatch for {}",
                case.name
            ),
            CaseClass::SyntaxError | CaseClass::LoweringError => {
                let expected_error = case.expected_error()?;
                ensure!(
                    output.stderr.starts_with("Error: ") && output.stderr.contains(&expected_error),
                    "Expected CLI error containing '{expected_error}' for {}, got '{}'",
                    case.name,
                    output.stderr
                );
            }
        }
    }
    Ok(())
}

#[test]
fn cli_trace_backend_prints_listing() -> Result<()> {
    let binary = Path::new(env!("CARGO_BIN_EXE_brainrot"));
    let program = Path::new(PROGRAMS_DIR).join("round_trip").join("program.bro");
    let output = run_cli(binary, &program, &["--backend", "trace"])?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.starts_with("declare print\nblock0 (entry):\n"));
    assert!(output.stdout.contains("alloca x"));
    Ok(())
}

#[test]
fn cli_dump_ir_writes_clif_to_stderr() -> Result<()> {
    let binary = Path::new(env!("CARGO_BIN_EXE_brainrot"));
    let program = Path::new(PROGRAMS_DIR).join("round_trip").join("program.bro");
    let output = run_cli(binary, &program, &["--dump-ir"])?;
    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout, "5\n");
    assert!(output.stderr.contains("; ---- CLIF brainrot_main ----"));
    Ok(())
}

#[test]
fn cli_rejects_missing_file_and_bad_arguments() -> Result<()> {
    let binary = Path::new(env!("CARGO_BIN_EXE_brainrot"));
    let output = run_cli(binary, Path::new("tests/programs/does_not_exist.bro"), &[])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.starts_with("Error: Reading"));

    let program = Path::new(PROGRAMS_DIR).join("round_trip").join("program.bro");
    let output = run_cli(binary, &program, &["--backend", "nope"])?;
    assert_eq!(output.exit_code, 1);
    Ok(())
}
