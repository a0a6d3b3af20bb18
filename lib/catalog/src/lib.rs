//! The closed catalog of intercepted entry points, the error-group/variant
//! tables, and the errno each variant code injects.
//!
//! This is data, not control flow: the shim and the harness both link
//! against it so that a function identifier and a variant code always mean
//! the same thing on both sides of the wire.

#![deny(unsafe_op_in_unsafe_fn)]

mod function;
mod variant;

pub use function::{Function, FunctionClass, ALL_FUNCTIONS};
pub use variant::{lookup, variants_for, Variant, VariantCode};

/// The error groups are a closed enumeration; only the ones enabled by
/// configuration contribute to the flattened per-function variant list the
/// scheduler walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorGroup {
    Inval,
    Io,
    Access,
    Memory,
    Interrupt,
    Path,
    Limits,
    Permissions,
    File,
}

impl ErrorGroup {
    pub const ALL: [ErrorGroup; 9] = [
        ErrorGroup::Inval,
        ErrorGroup::Io,
        ErrorGroup::Access,
        ErrorGroup::Memory,
        ErrorGroup::Interrupt,
        ErrorGroup::Path,
        ErrorGroup::Limits,
        ErrorGroup::Permissions,
        ErrorGroup::File,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorGroup::Inval => "inval",
            ErrorGroup::Io => "io",
            ErrorGroup::Access => "access",
            ErrorGroup::Memory => "memory",
            ErrorGroup::Interrupt => "interrupt",
            ErrorGroup::Path => "path",
            ErrorGroup::Limits => "limits",
            ErrorGroup::Permissions => "permissions",
            ErrorGroup::File => "file",
        }
    }

    pub fn from_name(name: &str) -> Option<ErrorGroup> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

impl std::fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_round_trips() {
        for g in ErrorGroup::ALL {
            assert_eq!(ErrorGroup::from_name(g.name()), Some(g));
        }
    }
}
