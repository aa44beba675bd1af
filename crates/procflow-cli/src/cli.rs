use clap::{Args, Parser, Subcommand};
use procflow::core::context::NodeContext;
use std::path::PathBuf;
use std::str::FromStr;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "procflow CLI - Check, format, export and run block-structured procedure scripts for configuration generation and analysis.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a procedure script, repair stale references and check its structure.
    Check(CheckArgs),
    /// Parse a procedure script and print it in normalized form.
    Format(FormatArgs),
    /// Write the structured (TOML) form of a procedure script.
    Export(ExportArgs),
    /// Run a procedure script against a system described in TOML.
    Run(RunArgs),
}

/// Where to find a procedure script and how it is framed.
#[derive(Args, Debug, Clone)]
pub struct ProcedureArgs {
    /// Path to the procedure script.
    #[arg(required = true, value_name = "FILE")]
    pub file: PathBuf,

    /// Block keyword framing the procedure (e.g. 'Analyser' ... 'EndAnalyser').
    #[arg(short, long, default_value = "Analyser", value_name = "KEYWORD")]
    pub block: String,

    /// Context the procedure's root nodes must be relevant to.
    #[arg(long, default_value = "Analysis", value_parser = parse_context, value_name = "CONTEXT")]
    pub context: NodeContext,
}

fn parse_context(value: &str) -> Result<NodeContext, String> {
    match NodeContext::from_str(value) {
        Ok(NodeContext::Inherit) | Err(()) => Err(format!(
            "'{}' is not a valid root context (expected Generation, Analysis, Control, Operate or Any)",
            value
        )),
        Ok(context) => Ok(context),
    }
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,
}

/// Arguments for the `format` subcommand.
#[derive(Args, Debug)]
pub struct FormatArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,

    /// Rewrite the script in place instead of printing it.
    #[arg(long)]
    pub in_place: bool,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,

    /// Path for the TOML output. Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,

    /// Path to the system description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub system: PathBuf,

    /// Number of times to execute the procedure.
    #[arg(short = 'n', long, default_value_t = 1, value_name = "INT")]
    pub iterations: usize,
}
