//! BFS-style variant exploration (§4.4).
//!
//! The state machine here is deliberately small: four integers/flags drive
//! the whole search, and every transition is named directly after the prose
//! in the specification's "Scheduler" section so the two read side by side.

mod model;

pub use model::{Call, Run};

use catalog::{Function, Variant, VariantCode};

/// What the scheduler decided for a controllable call at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantChoice {
    /// This call is this run's expansion point. The caller must record
    /// `variant` on the call and set `run.depth = call_num + 1`.
    Expansion(VariantCode),
    /// This call sits on the shared prefix; replay the reference run's
    /// variant verbatim, no depth update.
    Reuse(VariantCode),
    /// Past the expansion point for this run; run unmodified.
    Unmodified,
}

impl VariantChoice {
    pub fn code(self) -> VariantCode {
        match self {
            VariantChoice::Expansion(c) | VariantChoice::Reuse(c) => c,
            VariantChoice::Unmodified => 0,
        }
    }
}

/// The BFS cursor (§4.4 "State"). `runs` passed into its methods is always
/// the harness's list of already-accepted runs; the run currently being
/// built by the tracer is not yet a member of that list.
#[derive(Debug, Clone)]
pub struct Scheduler {
    current_run: usize,
    current_call: usize,
    current_variant: usize,
    next_call: bool,
    completed: bool,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler { current_run: 0, current_call: 0, current_variant: 0, next_call: false, completed: false }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn current_call(&self) -> usize {
        self.current_call
    }

    /// Decide what to do with a controllable call at `call_num` in the run
    /// under construction. `variants` is the already-flattened, already
    /// flag-filtered list for `function` (see `catalog::variants_for`).
    pub fn decide(
        &mut self,
        runs: &[Run],
        call_num: usize,
        _function: Function,
        variants: &[Variant],
    ) -> VariantChoice {
        if self.completed {
            return VariantChoice::Unmodified;
        }

        if call_num == self.current_call {
            let code = variants.get(self.current_variant).map(|v| v.code).unwrap_or(0);
            self.current_variant += 1;
            if self.current_variant >= variants.len() {
                self.next_call = true;
            }
            return VariantChoice::Expansion(code);
        }

        let reference = &runs[self.current_run];
        if call_num < reference.depth {
            let code = reference.calls[call_num].variant;
            if call_num + 1 == reference.calls.len() {
                self.go_to_next_run(runs);
            }
            return VariantChoice::Reuse(code);
        }

        VariantChoice::Unmodified
    }

    /// A notify-only call was observed at `call_num`. Baseline (`is_first_run`)
    /// runs never touch the cursor: the baseline exists precisely to capture
    /// the seed sequence without the scheduler's involvement.
    pub fn observe_notify(&mut self, runs: &[Run], call_num: usize, is_first_run: bool) {
        if self.completed || is_first_run {
            return;
        }
        if call_num == self.current_call {
            self.current_call += 1;
            let reference = &runs[self.current_run];
            if self.current_call >= reference.calls.len() {
                self.go_to_next_run(runs);
            }
        }
    }

    /// Called once between runs, after the just-finished run has been
    /// appended to `runs` (§4.4 "Between runs the controller calls nextRun").
    pub fn next_run(&mut self, runs: &[Run]) {
        if self.completed {
            return;
        }
        if self.next_call {
            self.current_variant = 0;
            self.current_call += 1;
            self.next_call = false;
            let reference = &runs[self.current_run];
            if self.current_call >= reference.calls.len() {
                self.go_to_next_run(runs);
            }
        }
    }

    fn go_to_next_run(&mut self, runs: &[Run]) {
        self.current_run += 1;
        if self.current_run >= runs.len() {
            self.completed = true;
            log::debug!("exploration complete after {} reference runs", runs.len());
            return;
        }
        self.current_variant = 0;
        self.current_call = runs[self.current_run].depth;
        log::trace!("advancing to reference run {} at call {}", self.current_run, self.current_call);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{ErrorGroup, Function};

    // scenario 1 from spec.md §8: control=open, variants=path,file against
    // `open("x", O_RDONLY); close(fd)`, replayed run by run.
    #[test]
    fn open_close_baseline_walks_all_four_open_variants_then_completes() {
        let open_variants =
            catalog::variants_for(Function::Open, &[ErrorGroup::Path, ErrorGroup::File], &["\"x\"".into(), "0".into()]);
        assert_eq!(open_variants.len(), 4);
        let expected_codes: Vec<VariantCode> = open_variants.iter().map(|v| v.code).collect();

        let mut runs =
            vec![Run { calls: vec![Call::new(Function::Open, vec![]), Call::new(Function::Close, vec![])], depth: 0 }];
        let mut scheduler = Scheduler::new();

        let mut accepted_variants = Vec::new();
        while !scheduler.is_completed() {
            let mut run = Run::new();
            let choice = scheduler.decide(&runs, 0, Function::Open, &open_variants);
            let mut call = Call::new(Function::Open, vec![]);
            call.variant = choice.code();
            if let VariantChoice::Expansion(_) = choice {
                run.depth = 1;
            }
            run.calls.push(call);

            let close_choice = scheduler.decide(&runs, 1, Function::Close, &[]);
            let mut close_call = Call::new(Function::Close, vec![]);
            close_call.variant = close_choice.code();
            run.calls.push(close_call);

            accepted_variants.push(run.calls[0].variant);
            runs.push(run);
            scheduler.next_run(&runs);
        }

        assert_eq!(accepted_variants, expected_codes);
        assert_eq!(runs.len(), 5); // baseline + 4 explorative runs
    }

    #[test]
    fn expansion_reproduces_prior_prefixes_and_never_revisits_a_triple() {
        let mut runs =
            vec![Run { calls: vec![Call::new(Function::Open, vec![]), Call::new(Function::Close, vec![])], depth: 0 }];
        let mut scheduler = Scheduler::new();
        let variants = catalog::variants_for(Function::Open, &[ErrorGroup::Path], &["\"x\"".into(), "0".into()]);
        assert_eq!(variants.len(), 2); // ENAMETOOLONG, ENOENT

        let mut seen = std::collections::HashSet::new();
        while !scheduler.is_completed() {
            let mut run = Run::new();
            for call_num in 0..2 {
                let function = if call_num == 0 { Function::Open } else { Function::Close };
                let choice = scheduler.decide(&runs, call_num, function, if call_num == 0 { &variants } else { &[] });
                if let VariantChoice::Expansion(_) = choice {
                    run.depth = call_num + 1;
                }
                let mut call = Call::new(function, vec![]);
                call.variant = choice.code();
                let triple = (runs.len(), call_num, call.variant);
                assert!(seen.insert(triple), "scheduler revisited {:?}", triple);
                run.calls.push(call);
            }
            runs.push(run);
            scheduler.next_run(&runs);
        }
        assert_eq!(runs.len(), 3); // baseline + ENAMETOOLONG + ENOENT
    }
}
