use crate::core::configuration::Configuration;

/// The execution environment handed through every lifecycle call.
///
/// The engine never inspects it; node kinds read and modify the configuration they
/// run against through it.
#[derive(Debug)]
pub struct ProcedureContext<'a> {
    pub configuration: &'a mut Configuration,
    iteration: usize,
}

impl<'a> ProcedureContext<'a> {
    pub fn new(configuration: &'a mut Configuration) -> Self {
        Self {
            configuration,
            iteration: 0,
        }
    }

    /// Number of the current execution pass, starting from 1 once execution begins.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: usize) {
        self.iteration = iteration;
    }
}
