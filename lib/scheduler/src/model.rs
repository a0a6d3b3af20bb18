use catalog::{Function, VariantCode};

/// One observed entry-point invocation inside a run (§3 "Call").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub function: Function,
    pub params: Vec<String>,
    pub retval: Option<String>,
    /// `0` until the scheduler (or shared-prefix replay) assigns otherwise.
    pub variant: VariantCode,
}

impl Call {
    pub fn new(function: Function, params: Vec<String>) -> Call {
        Call { function, params, retval: None, variant: 0 }
    }
}

/// One full execution of the target (§3 "Run").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub calls: Vec<Call>,
    /// Position of the first call after this run's expansion point. `0` for
    /// a run with no expansion point of its own (the baseline): nothing on
    /// it has been claimed as an expansion yet, so later runs may treat its
    /// entire call sequence as shared prefix rather than a reference that
    /// looks already-exhausted. Invariant: `depth <= len(calls)`.
    pub depth: usize,
}

impl Run {
    pub fn new() -> Run {
        Run { calls: Vec::new(), depth: 0 }
    }

    /// The `(function name, variant)` sequence used by P4 non-repetition
    /// checks.
    pub fn signature(&self) -> Vec<(Function, VariantCode)> {
        self.calls.iter().map(|c| (c.function, c.variant)).collect()
    }
}
