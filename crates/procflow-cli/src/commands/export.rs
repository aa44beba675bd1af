use super::load_procedure;
use crate::cli::ExportArgs;
use crate::error::Result;
use tracing::info;

pub fn run(args: ExportArgs) -> Result<()> {
    let procedure = load_procedure(&args.procedure)?;
    let document = procedure.to_toml()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &document)?;
            info!("Structured form written to {:?}", path);
            println!("✓ Structured form written to: {}", path.display());
        }
        None => print!("{}", document),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{RDF_SCRIPT, write_script};
    use procflow::workflows::procedure::Procedure;
    use tempfile::tempdir;

    #[test]
    fn exported_document_loads_back() {
        let dir = tempdir().unwrap();
        let procedure = write_script(dir.path(), "rdf.txt", RDF_SCRIPT);
        let output = dir.path().join("rdf.toml");

        run(ExportArgs {
            procedure,
            output: Some(output.clone()),
        })
        .unwrap();

        let document = std::fs::read_to_string(output).unwrap();
        let restored = Procedure::from_toml(&document).unwrap();
        assert_eq!(restored.serialise(), RDF_SCRIPT);
    }
}
