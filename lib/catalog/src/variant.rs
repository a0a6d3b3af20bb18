use crate::{ErrorGroup, Function};

/// The raw wire value (§4.4): tens digit is the error group, units
/// disambiguate within it. `0` means "run the real call" and is never part
/// of a per-function variant list.
pub type VariantCode = u8;

pub const EBADF: VariantCode = 10;
pub const EINVAL: VariantCode = 11;
pub const EIO: VariantCode = 20;
pub const EACCES: VariantCode = 30;
pub const EFAULT: VariantCode = 40;
pub const ENOMEM: VariantCode = 41;
pub const EINTR: VariantCode = 50;
pub const ENAMETOOLONG: VariantCode = 60;
pub const ENOENT: VariantCode = 61;
pub const ENOTDIR: VariantCode = 62;
pub const EDQUOT: VariantCode = 70;
pub const EFBIG: VariantCode = 71;
pub const ENOSPC: VariantCode = 72;
pub const EMFILE: VariantCode = 73;
pub const ENFILE: VariantCode = 74;
pub const EMLINK: VariantCode = 75;
pub const ENOLCK: VariantCode = 76;
pub const EPERM: VariantCode = 80;
pub const EROFS: VariantCode = 81;
pub const EISDIR: VariantCode = 90;
pub const EEXIST: VariantCode = 91;
pub const ELOOP: VariantCode = 92;
pub const EBUSY: VariantCode = 93;

/// A variant code paired with the errno it injects and a display name, for
/// logging and for the shim's `errno` assignment (§4.1 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub code: VariantCode,
    pub errno: libc::c_int,
    pub name: &'static str,
}

const fn v(code: VariantCode, errno: libc::c_int, name: &'static str) -> Variant {
    Variant { code, errno, name }
}

/// Look up the `Variant` for a raw wire code. Returns `None` for `0`
/// (unmodified) and for codes outside the closed catalog above.
pub fn lookup(code: VariantCode) -> Option<Variant> {
    Some(match code {
        EBADF => v(EBADF, libc::EBADF, "EBADF"),
        EINVAL => v(EINVAL, libc::EINVAL, "EINVAL"),
        EIO => v(EIO, libc::EIO, "EIO"),
        EACCES => v(EACCES, libc::EACCES, "EACCES"),
        EFAULT => v(EFAULT, libc::EFAULT, "EFAULT"),
        ENOMEM => v(ENOMEM, libc::ENOMEM, "ENOMEM"),
        EINTR => v(EINTR, libc::EINTR, "EINTR"),
        ENAMETOOLONG => v(ENAMETOOLONG, libc::ENAMETOOLONG, "ENAMETOOLONG"),
        ENOENT => v(ENOENT, libc::ENOENT, "ENOENT"),
        ENOTDIR => v(ENOTDIR, libc::ENOTDIR, "ENOTDIR"),
        EDQUOT => v(EDQUOT, libc::EDQUOT, "EDQUOT"),
        EFBIG => v(EFBIG, libc::EFBIG, "EFBIG"),
        ENOSPC => v(ENOSPC, libc::ENOSPC, "ENOSPC"),
        EMFILE => v(EMFILE, libc::EMFILE, "EMFILE"),
        ENFILE => v(ENFILE, libc::ENFILE, "ENFILE"),
        EMLINK => v(EMLINK, libc::EMLINK, "EMLINK"),
        ENOLCK => v(ENOLCK, libc::ENOLCK, "ENOLCK"),
        EPERM => v(EPERM, libc::EPERM, "EPERM"),
        EROFS => v(EROFS, libc::EROFS, "EROFS"),
        EISDIR => v(EISDIR, libc::EISDIR, "EISDIR"),
        EEXIST => v(EEXIST, libc::EEXIST, "EEXIST"),
        ELOOP => v(ELOOP, libc::ELOOP, "ELOOP"),
        EBUSY => v(EBUSY, libc::EBUSY, "EBUSY"),
        _ => return None,
    })
}

struct Entry {
    function: Function,
    group: ErrorGroup,
    codes: &'static [VariantCode],
}

// Per entry point, only a subset of a group's codes is defined (§4.4);
// unsupported codes degrade to normal execution. A (function, group) pair
// absent from this table contributes nothing when that group is enabled.
//
// `Function::Open`'s `File` row intentionally carries only `ELOOP`: the
// open-family's other file-class codes (`EEXIST`, `EISDIR`) are scoped to
// `O_CREAT`/write-intent call shapes and are filtered out by
// `is_applicable` below rather than listed here, so that the table always
// reflects what "file" means for a bare `open`.
const TABLE: &[Entry] = &[
    Entry { function: Function::Open, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Open, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Open, group: ErrorGroup::Interrupt, codes: &[EINTR] },
    Entry { function: Function::Open, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Open, group: ErrorGroup::Limits, codes: &[EMFILE, ENFILE, ENOSPC, EDQUOT] },
    Entry { function: Function::Open, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Open, group: ErrorGroup::File, codes: &[ELOOP] },

    Entry { function: Function::Close, group: ErrorGroup::Inval, codes: &[EBADF] },

    Entry { function: Function::Read, group: ErrorGroup::Inval, codes: &[EBADF] },
    Entry { function: Function::Read, group: ErrorGroup::Io, codes: &[EIO] },
    Entry { function: Function::Read, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Read, group: ErrorGroup::Interrupt, codes: &[EINTR] },

    Entry { function: Function::Write, group: ErrorGroup::Inval, codes: &[EBADF] },
    Entry { function: Function::Write, group: ErrorGroup::Io, codes: &[EIO] },
    Entry { function: Function::Write, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Write, group: ErrorGroup::Interrupt, codes: &[EINTR] },
    Entry { function: Function::Write, group: ErrorGroup::Limits, codes: &[EFBIG, ENOSPC] },
    Entry { function: Function::Write, group: ErrorGroup::Permissions, codes: &[EROFS] },

    Entry { function: Function::Readv, group: ErrorGroup::Inval, codes: &[EBADF, EINVAL] },
    Entry { function: Function::Readv, group: ErrorGroup::Io, codes: &[EIO] },
    Entry { function: Function::Readv, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Readv, group: ErrorGroup::Interrupt, codes: &[EINTR] },

    Entry { function: Function::Writev, group: ErrorGroup::Inval, codes: &[EBADF, EINVAL] },
    Entry { function: Function::Writev, group: ErrorGroup::Io, codes: &[EIO] },
    Entry { function: Function::Writev, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Writev, group: ErrorGroup::Interrupt, codes: &[EINTR] },

    Entry { function: Function::Lseek, group: ErrorGroup::Inval, codes: &[EBADF, EINVAL] },

    Entry { function: Function::Stat, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Stat, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Stat, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Stat, group: ErrorGroup::File, codes: &[ELOOP] },

    Entry { function: Function::Lstat, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Lstat, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Lstat, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },

    Entry { function: Function::Fstat, group: ErrorGroup::Inval, codes: &[EBADF] },
    Entry { function: Function::Fstat, group: ErrorGroup::Memory, codes: &[EFAULT] },

    Entry { function: Function::Mkdir, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Mkdir, group: ErrorGroup::Memory, codes: &[EFAULT] },
    Entry { function: Function::Mkdir, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Mkdir, group: ErrorGroup::Limits, codes: &[ENOSPC, EDQUOT] },
    Entry { function: Function::Mkdir, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Mkdir, group: ErrorGroup::File, codes: &[EEXIST, ELOOP] },

    Entry { function: Function::Rmdir, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Rmdir, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Rmdir, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Rmdir, group: ErrorGroup::File, codes: &[EBUSY, ELOOP] },

    Entry { function: Function::Unlink, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Unlink, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Unlink, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Unlink, group: ErrorGroup::File, codes: &[EISDIR, EBUSY, ELOOP] },

    Entry { function: Function::Rename, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Rename, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Rename, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Rename, group: ErrorGroup::File, codes: &[EBUSY, ELOOP, EEXIST] },
    Entry { function: Function::Rename, group: ErrorGroup::Limits, codes: &[EMLINK, ENOSPC] },

    Entry { function: Function::Chmod, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Chmod, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Chmod, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Chmod, group: ErrorGroup::File, codes: &[ELOOP] },

    Entry { function: Function::Chown, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Chown, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Chown, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Chown, group: ErrorGroup::File, codes: &[ELOOP] },

    Entry { function: Function::Truncate, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Truncate, group: ErrorGroup::Inval, codes: &[EINVAL] },
    Entry { function: Function::Truncate, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Truncate, group: ErrorGroup::Permissions, codes: &[EROFS] },
    Entry { function: Function::Truncate, group: ErrorGroup::File, codes: &[EISDIR, ELOOP] },
    Entry { function: Function::Truncate, group: ErrorGroup::Limits, codes: &[EFBIG] },

    Entry { function: Function::Ftruncate, group: ErrorGroup::Inval, codes: &[EBADF, EINVAL] },
    Entry { function: Function::Ftruncate, group: ErrorGroup::Permissions, codes: &[EROFS] },
    Entry { function: Function::Ftruncate, group: ErrorGroup::File, codes: &[EISDIR] },
    Entry { function: Function::Ftruncate, group: ErrorGroup::Limits, codes: &[EFBIG] },

    Entry { function: Function::Flock, group: ErrorGroup::Inval, codes: &[EBADF, EINVAL] },
    Entry { function: Function::Flock, group: ErrorGroup::Interrupt, codes: &[EINTR] },
    Entry { function: Function::Flock, group: ErrorGroup::Limits, codes: &[ENOLCK] },
    Entry { function: Function::Flock, group: ErrorGroup::File, codes: &[EBUSY] },

    Entry { function: Function::Fsync, group: ErrorGroup::Inval, codes: &[EBADF] },
    Entry { function: Function::Fsync, group: ErrorGroup::Io, codes: &[EIO] },
    Entry { function: Function::Fsync, group: ErrorGroup::Permissions, codes: &[EROFS] },

    Entry { function: Function::Link, group: ErrorGroup::Access, codes: &[EACCES] },
    Entry { function: Function::Link, group: ErrorGroup::Path, codes: &[ENAMETOOLONG, ENOENT, ENOTDIR] },
    Entry { function: Function::Link, group: ErrorGroup::Permissions, codes: &[EPERM, EROFS] },
    Entry { function: Function::Link, group: ErrorGroup::File, codes: &[EEXIST, ELOOP] },
    Entry { function: Function::Link, group: ErrorGroup::Limits, codes: &[EMLINK, ENOSPC] },
];

// `open`/`open64`/`creat`/`creat64` share one row in `TABLE` (under
// `Function::Open`); the others are aliased here rather than duplicating
// every row, since they differ only in which libc entry point called them.
fn canonical(function: Function) -> Function {
    match function {
        Function::Open64 | Function::Creat | Function::Creat64 => Function::Open,
        other => other,
    }
}

/// The ordered variant list for `function` under `group`, independent of any
/// particular call's flags. Empty if the table has no row for this pair.
pub fn table_codes(function: Function, group: ErrorGroup) -> &'static [VariantCode] {
    let function = canonical(function);
    TABLE
        .iter()
        .find(|e| e.function == function && e.group == group)
        .map(|e| e.codes)
        .unwrap_or(&[])
}

/// The flattened, ordered variant list the scheduler walks for `function`
/// across every `enabled` group (§4.4, §3 "Variant map").
///
/// `raw_params` are the call's stringified arguments (§6), used only to
/// resolve the two conditional cases noted in spec.md §9 and SPEC_FULL.md's
/// resolved-open-questions section:
/// - `EPERM` on the open family only applies under `O_NOATIME`.
/// - `EROFS` only applies when write access was requested.
/// - `EDQUOT`/`ENOSPC` on the open family only apply under `O_CREAT`.
pub fn variants_for(function: Function, enabled: &[ErrorGroup], raw_params: &[String]) -> Vec<Variant> {
    let mut out = Vec::new();
    for &group in ErrorGroup::ALL.iter() {
        if !enabled.contains(&group) {
            continue;
        }
        for &code in table_codes(function, group) {
            if is_applicable(function, code, raw_params) {
                out.push(lookup(code).expect("table codes are always in the catalog"));
            }
        }
    }
    out
}

const O_CREAT: i64 = 0o100;
const O_NOATIME: i64 = 0o1000000;
const O_WRONLY: i64 = 0o1;
const O_RDWR: i64 = 0o2;

fn open_flags(function: Function, raw_params: &[String]) -> Option<i64> {
    let is_open_family = matches!(
        canonical(function),
        Function::Open
    );
    if !is_open_family {
        return None;
    }
    // by convention the flags are the second stringified parameter
    // (`open(path, flags, ...)`); creat's implicit flags are synthesized by
    // the shim before this point (§4.1) so creat/creat64 calls still carry a
    // flags string here.
    raw_params.get(1)?.parse::<i64>().ok()
}

fn is_applicable(function: Function, code: VariantCode, raw_params: &[String]) -> bool {
    match code {
        EPERM => match open_flags(function, raw_params) {
            Some(flags) => flags & O_NOATIME != 0,
            None => true,
        },
        EROFS => match open_flags(function, raw_params) {
            Some(flags) => flags & (O_WRONLY | O_RDWR) != 0 || flags & O_CREAT != 0,
            None => true,
        },
        EDQUOT | ENOSPC => match open_flags(function, raw_params) {
            Some(flags) => flags & O_CREAT != 0,
            None => true,
        },
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_path_and_file_groups_give_four_variants() {
        // scenario 1 from spec.md §8: control=open, variants=path,file
        let groups = [ErrorGroup::Path, ErrorGroup::File];
        let variants = variants_for(Function::Open, &groups, &["\"x\"".into(), "0".into()]);
        let names: Vec<_> = variants.iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["ENAMETOOLONG", "ENOENT", "ENOTDIR", "ELOOP"]);
    }

    #[test]
    fn open_without_o_creat_skips_edquot_and_enospc() {
        let groups = [ErrorGroup::Limits];
        let variants = variants_for(Function::Open, &groups, &["\"x\"".into(), "0".into()]);
        let names: Vec<_> = variants.iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["EMFILE", "ENFILE"]);
    }

    #[test]
    fn open_with_o_creat_includes_edquot_and_enospc() {
        let groups = [ErrorGroup::Limits];
        let flags = O_CREAT.to_string();
        let variants = variants_for(Function::Open, &groups, &["\"x\"".into(), flags]);
        let names: Vec<_> = variants.iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["EMFILE", "ENFILE", "ENOSPC", "EDQUOT"]);
    }

    #[test]
    fn lookup_round_trips_every_catalog_code() {
        for code in [
            EBADF, EINVAL, EIO, EACCES, EFAULT, ENOMEM, EINTR, ENAMETOOLONG, ENOENT, ENOTDIR,
            EDQUOT, EFBIG, ENOSPC, EMFILE, ENFILE, EMLINK, ENOLCK, EPERM, EROFS, EISDIR, EEXIST,
            ELOOP, EBUSY,
        ] {
            assert_eq!(lookup(code).unwrap().code, code);
        }
    }

    #[test]
    fn open64_and_creat_share_opens_table_row() {
        assert_eq!(
            table_codes(Function::Open64, ErrorGroup::Path),
            table_codes(Function::Open, ErrorGroup::Path)
        );
        assert_eq!(
            table_codes(Function::Creat, ErrorGroup::File),
            table_codes(Function::Open, ErrorGroup::File)
        );
    }
}
