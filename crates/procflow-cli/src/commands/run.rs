use super::load_procedure;
use crate::cli::RunArgs;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use procflow::engine::progress::ProgressReporter;
use procflow::workflows;
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let mut procedure = load_procedure(&args.procedure)?;
    if !procedure.validate() {
        warn!("Some node references were unreachable and have been reset.");
    }
    procedure.check()?;

    let mut configuration = SystemConfig::from_file(&args.system)?.into_configuration()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Running procedure for {} iteration(s)...", args.iterations);
    info!("Invoking the procedure run workflow...");
    workflows::run::run(&mut procedure, &mut configuration, args.iterations, &reporter)?;

    info!(
        temperature = configuration.temperature,
        "Run finished after {} iteration(s).",
        args.iterations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ProcedureArgs;
    use crate::commands::test_support::{RDF_SCRIPT, write_script};
    use crate::error::CliError;
    use procflow::core::context::NodeContext;
    use std::fs;
    use tempfile::tempdir;

    const SYSTEM: &str = r#"
box-length = 10.0

[[site]]
name = "COM"
molecule = 0
origin = [0.0, 0.0, 0.0]

[[site]]
name = "COM"
molecule = 1
origin = [2.0, 0.0, 0.0]
"#;

    fn run_args(procedure: ProcedureArgs, dir: &std::path::Path, system: &str) -> RunArgs {
        let path = dir.join("system.toml");
        fs::write(&path, system).unwrap();
        RunArgs {
            procedure,
            system: path,
            iterations: 2,
        }
    }

    #[test]
    fn analysis_procedure_runs_to_completion() {
        let dir = tempdir().unwrap();
        let procedure = write_script(dir.path(), "rdf.txt", RDF_SCRIPT);

        assert!(run(run_args(procedure, dir.path(), SYSTEM)).is_ok());
    }

    #[test]
    fn missing_site_stack_fails_the_run() {
        let dir = tempdir().unwrap();
        let procedure = write_script(dir.path(), "rdf.txt", RDF_SCRIPT);

        let result = run(run_args(procedure, dir.path(), "box-length = 10.0\n"));
        assert!(matches!(result, Err(CliError::Run(_))));
    }

    #[test]
    fn generation_procedure_runs_with_its_own_block() {
        let dir = tempdir().unwrap();
        let mut procedure = write_script(
            dir.path(),
            "gen.txt",
            "Generator\n  Temperature\n    Temperature  250\n  EndTemperature\nEndGenerator\n",
        );
        procedure.block = "Generator".into();
        procedure.context = NodeContext::Generation;

        assert!(run(run_args(procedure, dir.path(), SYSTEM)).is_ok());
    }
}
