pub mod check;
pub mod export;
pub mod format;
pub mod run;

use crate::cli::ProcedureArgs;
use crate::error::{CliError, Result};
use procflow::workflows::procedure::Procedure;
use tracing::info;

/// Reads and parses the procedure script named on the command line.
pub(crate) fn load_procedure(args: &ProcedureArgs) -> Result<Procedure> {
    info!("Loading procedure from {:?}", &args.file);
    let source = std::fs::read_to_string(&args.file)?;
    Procedure::from_text(args.context, &args.block, &source).map_err(|source| {
        for diagnostic in source.diagnostics() {
            eprintln!("  {}", diagnostic);
        }
        CliError::Procedure {
            path: args.file.clone(),
            source,
        }
    })
}
