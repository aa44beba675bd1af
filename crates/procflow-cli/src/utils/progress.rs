use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use procflow::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// Renders procedure run events as a spinner per lifecycle phase and a bar over the
/// executed iterations.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(Self::phase_style());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);

        Box::new(move |progress: Progress| {
            let Ok(bar) = pb.lock() else {
                warn!("Progress bar lock is poisoned; dropping run event.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(Self::phase_style());
                    bar.set_prefix(name);
                    bar.set_message("running");
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::IterationsStart { total } => {
                    bar.disable_steady_tick();
                    bar.set_style(Self::iteration_style());
                    bar.set_length(total);
                    bar.set_position(0);
                }
                Progress::IterationFinish { iteration } => {
                    bar.set_message(format!("iteration {}", iteration));
                    bar.inc(1);
                }
                Progress::IterationsFinish => {
                    if let Some(total) = bar.length() {
                        bar.set_position(total);
                    }
                }
                Progress::PhaseFinish => {
                    bar.disable_steady_tick();
                    bar.finish_with_message("done");
                }
                Progress::Message(msg) => bar.println(format!("  {}", msg)),
            }
        })
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:>9.bold} {msg}")
            .expect("Failed to create phase style template")
    }

    fn iteration_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:>9.bold} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}",
        )
        .expect("Failed to create iteration style template")
        .progress_chars("=> ")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_starts_hidden_and_finished() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn execute_phase_counts_iterations() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Execute" });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.prefix(), "Execute");
            assert!(!pb.is_finished());
        }

        callback(Progress::IterationsStart { total: 4 });
        callback(Progress::IterationFinish { iteration: 1 });
        callback(Progress::IterationFinish { iteration: 2 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(4));
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.message(), "iteration 2");
        }

        callback(Progress::IterationsFinish);
        assert_eq!(handler.pb.lock().unwrap().position(), 4);

        callback(Progress::PhaseFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "done");
    }

    #[test]
    fn events_from_another_thread_reach_the_bar() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Finalise" });
            callback(Progress::Message("Exported 'rdf.csv'".into()));
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.prefix(), "Finalise");
    }
}
