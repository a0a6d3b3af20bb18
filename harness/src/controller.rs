//! The two `tracer::CallController` implementations the session driver
//! switches between: a no-op baseline pass and the BFS-driven exploration
//! pass (§4.3 step 3 "hand the call to the controller", §4.4).

use catalog::{ErrorGroup, Function, VariantCode};
use scheduler::{Run, Scheduler, VariantChoice};
use tracer::CallController;

/// Captures the target's unmodified call sequence. Every call runs for
/// real, and the run has no expansion point of its own: `depth` stays 0,
/// so the scheduler treats the whole baseline as shared prefix available
/// for reuse rather than a run it could prematurely consider exhausted.
#[derive(Default)]
pub struct BaselineController;

impl BaselineController {
    pub fn new() -> BaselineController {
        BaselineController::default()
    }
}

impl CallController for BaselineController {
    fn decide(&mut self, _call_num: usize, _function: Function, _params: &[String], _is_control: bool) -> VariantCode {
        0
    }

    fn depth(&self) -> usize {
        0
    }
}

/// Drives one explorative run: every controllable call is handed to the
/// scheduler, every notify-only call only advances its cursor (§4.4
/// "observe_notify").
pub struct ExplorationController<'a> {
    scheduler: &'a mut Scheduler,
    runs: &'a [Run],
    enabled_groups: &'a [ErrorGroup],
    depth: usize,
}

impl<'a> ExplorationController<'a> {
    pub fn new(scheduler: &'a mut Scheduler, runs: &'a [Run], enabled_groups: &'a [ErrorGroup]) -> Self {
        ExplorationController { scheduler, runs, enabled_groups, depth: 0 }
    }
}

impl<'a> CallController for ExplorationController<'a> {
    fn decide(&mut self, call_num: usize, function: Function, params: &[String], is_control: bool) -> VariantCode {
        if !is_control {
            self.scheduler.observe_notify(self.runs, call_num, false);
            return 0;
        }

        let variants = catalog::variants_for(function, self.enabled_groups, params);
        let choice = self.scheduler.decide(self.runs, call_num, function, &variants);
        if let VariantChoice::Expansion(_) = choice {
            self.depth = call_num + 1;
        }
        choice.code()
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
