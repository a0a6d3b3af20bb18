//! Replacements for the 24 controllable entry points (§3, §4.4). Each
//! follows the same shape: render parameters, run the notify/control
//! exchange, either fake an error or call through to the real
//! implementation, then report the outcome.

use crate::dispatch::{begin, finish, render_cstr, render_ptr, set_errno, Outcome};
use catalog::Function;
use std::ffi::c_char;
use std::os::raw::{c_int, c_void};
use std::sync::OnceLock;

macro_rules! real_fn {
    ($accessor:ident, $name:literal, $ty:ty) => {
        fn $accessor() -> $ty {
            static CACHE: OnceLock<$ty> = OnceLock::new();
            *CACHE.get_or_init(|| unsafe { crate::dispatch::next_symbol::<$ty>(concat!($name, "\0").as_bytes()) })
        }
    };
}

real_fn!(real_open, "open", unsafe extern "C" fn(*const c_char, c_int, libc::mode_t) -> c_int);
real_fn!(real_open64, "open64", unsafe extern "C" fn(*const c_char, c_int, libc::mode_t) -> c_int);
real_fn!(real_creat, "creat", unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int);
real_fn!(real_creat64, "creat64", unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int);
real_fn!(real_close, "close", unsafe extern "C" fn(c_int) -> c_int);
real_fn!(real_read, "read", unsafe extern "C" fn(c_int, *mut c_void, libc::size_t) -> isize);
real_fn!(real_write, "write", unsafe extern "C" fn(c_int, *const c_void, libc::size_t) -> isize);
real_fn!(real_readv, "readv", unsafe extern "C" fn(c_int, *const libc::iovec, c_int) -> isize);
real_fn!(real_writev, "writev", unsafe extern "C" fn(c_int, *const libc::iovec, c_int) -> isize);
real_fn!(real_lseek, "lseek", unsafe extern "C" fn(c_int, libc::off_t, c_int) -> libc::off_t);
real_fn!(real_xstat, "__xstat", unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int);
real_fn!(real_lxstat, "__lxstat", unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int);
real_fn!(real_fxstat, "__fxstat", unsafe extern "C" fn(c_int, c_int, *mut libc::stat) -> c_int);
real_fn!(real_mkdir, "mkdir", unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int);
real_fn!(real_rmdir, "rmdir", unsafe extern "C" fn(*const c_char) -> c_int);
real_fn!(real_unlink, "unlink", unsafe extern "C" fn(*const c_char) -> c_int);
real_fn!(real_rename, "rename", unsafe extern "C" fn(*const c_char, *const c_char) -> c_int);
real_fn!(real_chmod, "chmod", unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int);
real_fn!(real_chown, "chown", unsafe extern "C" fn(*const c_char, libc::uid_t, libc::gid_t) -> c_int);
real_fn!(real_truncate, "truncate", unsafe extern "C" fn(*const c_char, libc::off_t) -> c_int);
real_fn!(real_ftruncate, "ftruncate", unsafe extern "C" fn(c_int, libc::off_t) -> c_int);
real_fn!(real_flock, "flock", unsafe extern "C" fn(c_int, c_int) -> c_int);
real_fn!(real_fsync, "fsync", unsafe extern "C" fn(c_int) -> c_int);
real_fn!(real_link, "link", unsafe extern "C" fn(*const c_char, *const c_char) -> c_int);

/// Shared helper for the three `int`-returning, errno-on-`-1` wrappers:
/// run the notify/control exchange, fake or forward, report the retval.
unsafe fn guarded_int(function: Function, params: Vec<String>, real: impl FnOnce() -> c_int) -> c_int {
    let retval = match begin(function, params) {
        Outcome::Fake { errno } => {
            set_errno(errno);
            -1
        }
        Outcome::RunReal => real(),
    };
    finish(function, retval as i64);
    retval
}

unsafe fn guarded_ssize(function: Function, params: Vec<String>, real: impl FnOnce() -> isize) -> isize {
    let retval = match begin(function, params) {
        Outcome::Fake { errno } => {
            set_errno(errno);
            -1
        }
        Outcome::RunReal => real(),
    };
    finish(function, retval as i64);
    retval
}

#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let mut params = vec![render_cstr(path), flags.to_string()];
    if flags & libc::O_CREAT != 0 {
        params.push(format!("{mode:o}"));
    }
    guarded_int(Function::Open, params, || real_open()(path, flags, mode))
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let mut params = vec![render_cstr(path), flags.to_string()];
    if flags & libc::O_CREAT != 0 {
        params.push(format!("{mode:o}"));
    }
    guarded_int(Function::Open64, params, || real_open64()(path, flags, mode))
}

// creat(path, mode) is equivalent to open(path, O_CREAT|O_WRONLY|O_TRUNC, mode);
// the implicit flags are synthesized here so the harness sees the same
// (path, flags, mode) shape it gets from open/open64.
const CREAT_IMPLIED_FLAGS: c_int = libc::O_CREAT | libc::O_WRONLY | libc::O_TRUNC;

#[no_mangle]
pub unsafe extern "C" fn creat(path: *const c_char, mode: libc::mode_t) -> c_int {
    let params = vec![render_cstr(path), CREAT_IMPLIED_FLAGS.to_string(), format!("{mode:o}")];
    guarded_int(Function::Creat, params, || real_creat()(path, mode))
}

#[no_mangle]
pub unsafe extern "C" fn creat64(path: *const c_char, mode: libc::mode_t) -> c_int {
    let params = vec![render_cstr(path), CREAT_IMPLIED_FLAGS.to_string(), format!("{mode:o}")];
    guarded_int(Function::Creat64, params, || real_creat64()(path, mode))
}

#[no_mangle]
pub unsafe extern "C" fn close(fd: c_int) -> c_int {
    guarded_int(Function::Close, vec![fd.to_string()], || real_close()(fd))
}

#[no_mangle]
pub unsafe extern "C" fn read(fd: c_int, buf: *mut c_void, count: libc::size_t) -> isize {
    let params = vec![fd.to_string(), render_ptr(buf), count.to_string()];
    guarded_ssize(Function::Read, params, || real_read()(fd, buf, count))
}

#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const c_void, count: libc::size_t) -> isize {
    let params = vec![fd.to_string(), render_ptr(buf), count.to_string()];
    guarded_ssize(Function::Write, params, || real_write()(fd, buf, count))
}

#[no_mangle]
pub unsafe extern "C" fn readv(fd: c_int, iov: *const libc::iovec, iovcnt: c_int) -> isize {
    let params = vec![fd.to_string(), render_ptr(iov as *const c_void), iovcnt.to_string()];
    guarded_ssize(Function::Readv, params, || real_readv()(fd, iov, iovcnt))
}

#[no_mangle]
pub unsafe extern "C" fn writev(fd: c_int, iov: *const libc::iovec, iovcnt: c_int) -> isize {
    let params = vec![fd.to_string(), render_ptr(iov as *const c_void), iovcnt.to_string()];
    guarded_ssize(Function::Writev, params, || real_writev()(fd, iov, iovcnt))
}

#[no_mangle]
pub unsafe extern "C" fn lseek(fd: c_int, offset: libc::off_t, whence: c_int) -> libc::off_t {
    let params = vec![fd.to_string(), offset.to_string(), whence.to_string()];
    let retval = match begin(Function::Lseek, params) {
        Outcome::Fake { errno } => {
            set_errno(errno);
            -1
        }
        Outcome::RunReal => real_lseek()(fd, offset, whence),
    };
    finish(Function::Lseek, retval as i64);
    retval
}

#[no_mangle]
pub unsafe extern "C" fn __xstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    let params = vec![render_cstr(path)];
    guarded_int(Function::Stat, params, || real_xstat()(ver, path, buf))
}

#[no_mangle]
pub unsafe extern "C" fn __lxstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    let params = vec![render_cstr(path)];
    guarded_int(Function::Lstat, params, || real_lxstat()(ver, path, buf))
}

#[no_mangle]
pub unsafe extern "C" fn __fxstat(ver: c_int, fd: c_int, buf: *mut libc::stat) -> c_int {
    let params = vec![fd.to_string()];
    guarded_int(Function::Fstat, params, || real_fxstat()(ver, fd, buf))
}

#[no_mangle]
pub unsafe extern "C" fn mkdir(path: *const c_char, mode: libc::mode_t) -> c_int {
    let params = vec![render_cstr(path), format!("{mode:o}")];
    guarded_int(Function::Mkdir, params, || real_mkdir()(path, mode))
}

#[no_mangle]
pub unsafe extern "C" fn rmdir(path: *const c_char) -> c_int {
    guarded_int(Function::Rmdir, vec![render_cstr(path)], || real_rmdir()(path))
}

#[no_mangle]
pub unsafe extern "C" fn unlink(path: *const c_char) -> c_int {
    guarded_int(Function::Unlink, vec![render_cstr(path)], || real_unlink()(path))
}

#[no_mangle]
pub unsafe extern "C" fn rename(old: *const c_char, new: *const c_char) -> c_int {
    let params = vec![render_cstr(old), render_cstr(new)];
    guarded_int(Function::Rename, params, || real_rename()(old, new))
}

#[no_mangle]
pub unsafe extern "C" fn chmod(path: *const c_char, mode: libc::mode_t) -> c_int {
    let params = vec![render_cstr(path), format!("{mode:o}")];
    guarded_int(Function::Chmod, params, || real_chmod()(path, mode))
}

#[no_mangle]
pub unsafe extern "C" fn chown(path: *const c_char, owner: libc::uid_t, group: libc::gid_t) -> c_int {
    let params = vec![render_cstr(path), owner.to_string(), group.to_string()];
    guarded_int(Function::Chown, params, || real_chown()(path, owner, group))
}

#[no_mangle]
pub unsafe extern "C" fn truncate(path: *const c_char, length: libc::off_t) -> c_int {
    let params = vec![render_cstr(path), length.to_string()];
    guarded_int(Function::Truncate, params, || real_truncate()(path, length))
}

#[no_mangle]
pub unsafe extern "C" fn ftruncate(fd: c_int, length: libc::off_t) -> c_int {
    let params = vec![fd.to_string(), length.to_string()];
    guarded_int(Function::Ftruncate, params, || real_ftruncate()(fd, length))
}

#[no_mangle]
pub unsafe extern "C" fn flock(fd: c_int, operation: c_int) -> c_int {
    let params = vec![fd.to_string(), operation.to_string()];
    guarded_int(Function::Flock, params, || real_flock()(fd, operation))
}

#[no_mangle]
pub unsafe extern "C" fn fsync(fd: c_int) -> c_int {
    guarded_int(Function::Fsync, vec![fd.to_string()], || real_fsync()(fd))
}

#[no_mangle]
pub unsafe extern "C" fn link(old: *const c_char, new: *const c_char) -> c_int {
    let params = vec![render_cstr(old), render_cstr(new)];
    guarded_int(Function::Link, params, || real_link()(old, new))
}
