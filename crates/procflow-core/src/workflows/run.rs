use super::procedure::Procedure;
use crate::core::configuration::Configuration;
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// Runs the full lifecycle of a procedure against a configuration.
///
/// The procedure is prepared once, executed `iterations` times (the context's iteration
/// counter runs from 1), and finalised once. The first failing node aborts the run;
/// changes already made to the configuration are kept.
///
/// # Arguments
///
/// * `procedure` - The procedure to run.
/// * `configuration` - The configuration the nodes read and modify.
/// * `iterations` - Number of execution passes.
/// * `reporter` - Receives phase and iteration progress.
///
/// # Errors
///
/// Returns the [`NodeError`] of the first node to fail, attributed to that node.
#[instrument(skip_all, name = "run_workflow", fields(iterations = iterations))]
pub fn run(
    procedure: &mut Procedure,
    configuration: &mut Configuration,
    iterations: usize,
    reporter: &ProgressReporter,
) -> Result<(), NodeError> {
    let mut ctx = ProcedureContext::new(configuration);

    reporter.report(Progress::PhaseStart { name: "Prepare" });
    procedure.prepare(&mut ctx)?;
    reporter.report(Progress::Message(format!(
        "Prepared {} node(s)",
        procedure.tree().node_count()
    )));
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Execute" });
    reporter.report(Progress::IterationsStart {
        total: iterations as u64,
    });
    for iteration in 1..=iterations {
        ctx.set_iteration(iteration);
        procedure.execute(&mut ctx)?;
        reporter.report(Progress::IterationFinish { iteration });
    }
    reporter.report(Progress::IterationsFinish);
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Finalise" });
    procedure.finalise(&mut ctx)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        "Procedure '{}' completed {} iteration(s)",
        procedure.block_keyword(),
        iterations
    );
    Ok(())
}
