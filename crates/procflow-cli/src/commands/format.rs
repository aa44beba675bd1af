use super::load_procedure;
use crate::cli::FormatArgs;
use crate::error::Result;
use tracing::info;

pub fn run(args: FormatArgs) -> Result<()> {
    let procedure = load_procedure(&args.procedure)?;
    let formatted = procedure.serialise();

    if args.in_place {
        std::fs::write(&args.procedure.file, &formatted)?;
        info!("Rewrote {:?} in normalized form.", &args.procedure.file);
    } else {
        print!("{}", formatted);
    }
    Ok(())
}
