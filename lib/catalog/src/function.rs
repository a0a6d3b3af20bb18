/// Which of the three classes (§3) an entry point falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    /// Eligible for error injection.
    Controllable,
    /// Observed but never faked.
    NotifyOnly,
}

macro_rules! functions {
    ( $( $variant:ident => $name:expr, $id:expr, $class:ident ; )+ ) => {
        /// A fixed integer identifier used to index tables (§3).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Function {
            $( $variant, )+
        }

        impl Function {
            /// The wire name used in `NOTIFY`/`CONTROL`/`EXEC` messages.
            pub fn name(self) -> &'static str {
                match self {
                    $( Function::$variant => $name, )+
                }
            }

            pub fn from_name(name: &str) -> Option<Function> {
                match name {
                    $( $name => Some(Function::$variant), )+
                    _ => None,
                }
            }

            /// The fixed integer identifier from §3.
            pub fn id(self) -> u32 {
                match self {
                    $( Function::$variant => $id, )+
                }
            }

            pub fn class(self) -> FunctionClass {
                match self {
                    $( Function::$variant => FunctionClass::$class, )+
                }
            }

            pub fn is_controllable(self) -> bool {
                self.class() == FunctionClass::Controllable
            }
        }

        pub const ALL_FUNCTIONS: &[Function] = &[ $( Function::$variant, )+ ];
    };
}

// The 24 controllable entry points followed by the ~21 notify-only ones
// (§3). Identifiers are stable and used to index the variant tables in
// `variant.rs`; do not renumber without updating them together.
functions! {
    // --- controllable (24) ---
    Open      => "open",      0,  Controllable;
    Open64    => "open64",    1,  Controllable;
    Creat     => "creat",     2,  Controllable;
    Creat64   => "creat64",   3,  Controllable;
    Close     => "close",     4,  Controllable;
    Read      => "read",      5,  Controllable;
    Write     => "write",     6,  Controllable;
    Readv     => "readv",     7,  Controllable;
    Writev    => "writev",    8,  Controllable;
    Lseek     => "lseek",     9,  Controllable;
    Stat      => "stat",      10, Controllable;
    Lstat     => "lstat",     11, Controllable;
    Fstat     => "fstat",     12, Controllable;
    Mkdir     => "mkdir",     13, Controllable;
    Rmdir     => "rmdir",     14, Controllable;
    Unlink    => "unlink",    15, Controllable;
    Rename    => "rename",    16, Controllable;
    Chmod     => "chmod",     17, Controllable;
    Chown     => "chown",     18, Controllable;
    Truncate  => "truncate",  19, Controllable;
    Ftruncate => "ftruncate", 20, Controllable;
    Flock     => "flock",     21, Controllable;
    Fsync     => "fsync",     22, Controllable;
    Link      => "link",      23, Controllable;

    // --- notify-only (~21) ---
    Mmap      => "mmap",      24, NotifyOnly;
    Munmap    => "munmap",    25, NotifyOnly;
    Select    => "select",    26, NotifyOnly;
    Pselect   => "pselect",   27, NotifyOnly;
    Poll      => "poll",      28, NotifyOnly;
    Dup       => "dup",       29, NotifyOnly;
    Dup2      => "dup2",      30, NotifyOnly;
    Mount     => "mount",     31, NotifyOnly;
    Umount    => "umount",    32, NotifyOnly;
    Umask     => "umask",     33, NotifyOnly;
    Fcntl     => "fcntl",     34, NotifyOnly;
    Ioctl     => "ioctl",     35, NotifyOnly;
    Getcwd    => "getcwd",    36, NotifyOnly;
    Chdir     => "chdir",     37, NotifyOnly;
    Opendir   => "opendir",   38, NotifyOnly;
    Readdir   => "readdir",   39, NotifyOnly;
    Closedir  => "closedir",  40, NotifyOnly;
    Pipe      => "pipe",      41, NotifyOnly;
    Sync      => "sync",      42, NotifyOnly;
    Fork      => "fork",      43, NotifyOnly;
    Execve    => "execve",    44, NotifyOnly;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_45_entry_points() {
        assert_eq!(ALL_FUNCTIONS.len(), 45);
    }

    #[test]
    fn controllable_count_matches_spec() {
        let controllable = ALL_FUNCTIONS.iter().filter(|f| f.is_controllable()).count();
        assert_eq!(controllable, 24);
    }

    #[test]
    fn names_and_ids_round_trip() {
        for f in ALL_FUNCTIONS {
            assert_eq!(Function::from_name(f.name()), Some(*f));
        }
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<u32> = ALL_FUNCTIONS.iter().map(|f| f.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ALL_FUNCTIONS.len());
    }
}
