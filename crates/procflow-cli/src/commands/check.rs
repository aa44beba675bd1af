use super::load_procedure;
use crate::cli::CheckArgs;
use crate::error::Result;
use tracing::{info, warn};

pub fn run(args: CheckArgs) -> Result<()> {
    let mut procedure = load_procedure(&args.procedure)?;

    if !procedure.validate() {
        warn!("Some node references were unreachable and have been reset.");
        println!("Warning: some node references were unreachable and have been reset.");
    }
    procedure.check()?;

    let n_nodes = procedure.tree().node_count();
    info!("Procedure passed all structural checks ({} nodes).", n_nodes);
    println!(
        "✓ '{}' is valid ({} nodes).",
        args.procedure.file.display(),
        n_nodes
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{RDF_SCRIPT, write_script};
    use crate::error::CliError;
    use tempfile::tempdir;

    #[test]
    fn valid_script_passes() {
        let dir = tempdir().unwrap();
        let procedure = write_script(dir.path(), "rdf.txt", RDF_SCRIPT);

        assert!(run(CheckArgs { procedure }).is_ok());
    }

    #[test]
    fn parse_errors_are_reported_with_the_path() {
        let dir = tempdir().unwrap();
        let procedure = write_script(
            dir.path(),
            "bad.txt",
            "Analyser\n  Teleport  'X'\n  EndTeleport\nEndAnalyser\n",
        );

        let err = run(CheckArgs { procedure }).unwrap_err();
        match err {
            CliError::Procedure { path, source } => {
                assert!(path.ends_with("bad.txt"));
                assert_eq!(source.diagnostics().len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn undefined_parameters_fail_the_check() {
        let dir = tempdir().unwrap();
        let procedure = write_script(
            dir.path(),
            "cond.txt",
            "Analyser\n  IfValueInRange\n    Value  'missing * 2'\n  EndIfValueInRange\nEndAnalyser\n",
        );

        assert!(matches!(run(CheckArgs { procedure }), Err(CliError::Check(_))));
    }
}
