use catalog::Function;
use scheduler::Call;

/// The two canonicalization strategies named in spec.md §4.5 "Canonicalization",
/// modeled as data rather than as a trait object hierarchy: the only thing
/// that varies between them is which parameter slots contribute a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonicalization {
    /// The function name alone.
    NameOnly,
    /// `name(p0,p1,...)` where only the pre-declared base parameter slot
    /// carries its value; the rest are empty but their commas are kept to
    /// encode arity (see [`base_param_index`]).
    BaseParameter,
}

/// The per-function base-parameter position, mirroring `baseParamMap`: most
/// functions distinguish on their first argument (a path or fd), but `link`
/// and the `mmap` family distinguish on their second (the destination link
/// path, the mapped-in pointer) since the first argument there is shared or
/// uninteresting across calls. `None` for a function not in the original
/// table — those calls canonicalize to a bare `name()`, carrying no value.
fn base_param_index(function: Function) -> Option<usize> {
    match function {
        Function::Open
        | Function::Open64
        | Function::Creat
        | Function::Creat64
        | Function::Close
        | Function::Read
        | Function::Write
        | Function::Lseek
        | Function::Stat
        | Function::Lstat
        | Function::Fstat
        | Function::Mkdir
        | Function::Rmdir
        | Function::Unlink
        | Function::Chmod
        | Function::Chown
        | Function::Flock
        | Function::Fsync
        | Function::Dup
        | Function::Dup2
        | Function::Mount
        | Function::Umount
        | Function::Umask
        | Function::Opendir => Some(0),
        Function::Link | Function::Mmap | Function::Munmap => Some(1),
        _ => None,
    }
}

impl Canonicalization {
    pub fn apply(self, call: &Call) -> String {
        match self {
            Canonicalization::NameOnly => call.function.name().to_string(),
            Canonicalization::BaseParameter => {
                let mut slots = vec![String::new(); call.params.len()];
                if let Some(index) = base_param_index(call.function) {
                    if let Some(slot) = slots.get_mut(index) {
                        if let Some(base) = call.params.get(index) {
                            *slot = base.clone();
                        }
                    }
                }
                format!("{}({})", call.function.name(), slots.join(","))
            }
        }
    }
}
