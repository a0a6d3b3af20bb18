//! Replacements for the ~21 notify-only entry points (§3, §4.2). These are
//! never faked — the exchange only ever reports the call and its return
//! value, so each wrapper always runs the real implementation.

use crate::dispatch::{begin, finish, render_cstr, render_ptr};
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

real_fn!(real_mmap, "mmap", unsafe extern "C" fn(*mut c_void, libc::size_t, c_int, c_int, c_int, libc::off_t) -> *mut c_void);
real_fn!(real_munmap, "munmap", unsafe extern "C" fn(*mut c_void, libc::size_t) -> c_int);
real_fn!(real_select, "select", unsafe extern "C" fn(c_int, *mut libc::fd_set, *mut libc::fd_set, *mut libc::fd_set, *mut libc::timeval) -> c_int);
real_fn!(real_pselect, "pselect", unsafe extern "C" fn(c_int, *mut libc::fd_set, *mut libc::fd_set, *mut libc::fd_set, *const libc::timespec, *const libc::sigset_t) -> c_int);
real_fn!(real_poll, "poll", unsafe extern "C" fn(*mut libc::pollfd, libc::nfds_t, c_int) -> c_int);
real_fn!(real_dup, "dup", unsafe extern "C" fn(c_int) -> c_int);
real_fn!(real_dup2, "dup2", unsafe extern "C" fn(c_int, c_int) -> c_int);
real_fn!(real_mount, "mount", unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, libc::c_ulong, *const c_void) -> c_int);
real_fn!(real_umount, "umount", unsafe extern "C" fn(*const c_char) -> c_int);
real_fn!(real_umask, "umask", unsafe extern "C" fn(libc::mode_t) -> libc::mode_t);
real_fn!(real_fcntl, "fcntl", unsafe extern "C" fn(c_int, c_int, libc::c_long) -> c_int);
real_fn!(real_ioctl, "ioctl", unsafe extern "C" fn(c_int, libc::c_ulong, libc::c_long) -> c_int);
real_fn!(real_getcwd, "getcwd", unsafe extern "C" fn(*mut c_char, libc::size_t) -> *mut c_char);
real_fn!(real_chdir, "chdir", unsafe extern "C" fn(*const c_char) -> c_int);
real_fn!(real_opendir, "opendir", unsafe extern "C" fn(*const c_char) -> *mut libc::DIR);
real_fn!(real_readdir, "readdir", unsafe extern "C" fn(*mut libc::DIR) -> *mut libc::dirent);
real_fn!(real_closedir, "closedir", unsafe extern "C" fn(*mut libc::DIR) -> c_int);
real_fn!(real_pipe, "pipe", unsafe extern "C" fn(*mut c_int) -> c_int);
real_fn!(real_sync, "sync", unsafe extern "C" fn());
real_fn!(real_fork, "fork", unsafe extern "C" fn() -> libc::pid_t);
real_fn!(real_execve, "execve", unsafe extern "C" fn(*const c_char, *const *const c_char, *const *const c_char) -> c_int);

/// Records the call, runs the real implementation, records the return
/// value. `retval` is whatever the real call produced, widened to `i64`
/// for the wire regardless of the C return type.
fn record<T>(function: Function, params: Vec<String>, real: impl FnOnce() -> T, to_wire: impl FnOnce(&T) -> i64) -> T {
    let _ = begin(function, params);
    let retval = real();
    finish(function, to_wire(&retval));
    retval
}

#[no_mangle]
pub unsafe extern "C" fn mmap(addr: *mut c_void, length: libc::size_t, prot: c_int, flags: c_int, fd: c_int, offset: libc::off_t) -> *mut c_void {
    let params = vec![render_ptr(addr), length.to_string(), prot.to_string(), flags.to_string(), fd.to_string(), offset.to_string()];
    record(Function::Mmap, params, || real_mmap()(addr, length, prot, flags, fd, offset), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn munmap(addr: *mut c_void, length: libc::size_t) -> c_int {
    let params = vec![render_ptr(addr), length.to_string()];
    record(Function::Munmap, params, || real_munmap()(addr, length), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn select(
    nfds: c_int,
    readfds: *mut libc::fd_set,
    writefds: *mut libc::fd_set,
    errorfds: *mut libc::fd_set,
    timeout: *mut libc::timeval,
) -> c_int {
    let params = vec![nfds.to_string()];
    record(Function::Select, params, || real_select()(nfds, readfds, writefds, errorfds, timeout), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn pselect(
    nfds: c_int,
    readfds: *mut libc::fd_set,
    writefds: *mut libc::fd_set,
    errorfds: *mut libc::fd_set,
    timeout: *const libc::timespec,
    sigmask: *const libc::sigset_t,
) -> c_int {
    let params = vec![nfds.to_string()];
    record(Function::Pselect, params, || real_pselect()(nfds, readfds, writefds, errorfds, timeout, sigmask), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn poll(fds: *mut libc::pollfd, nfds: libc::nfds_t, timeout: c_int) -> c_int {
    let params = vec![render_ptr(fds as *const c_void), nfds.to_string(), timeout.to_string()];
    record(Function::Poll, params, || real_poll()(fds, nfds, timeout), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn dup(oldfd: c_int) -> c_int {
    record(Function::Dup, vec![oldfd.to_string()], || real_dup()(oldfd), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn dup2(oldfd: c_int, newfd: c_int) -> c_int {
    let params = vec![oldfd.to_string(), newfd.to_string()];
    record(Function::Dup2, params, || real_dup2()(oldfd, newfd), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn mount(source: *const c_char, target: *const c_char, fstype: *const c_char, flags: libc::c_ulong, data: *const c_void) -> c_int {
    let params = vec![render_cstr(source), render_cstr(target), render_cstr(fstype), flags.to_string()];
    record(Function::Mount, params, || real_mount()(source, target, fstype, flags, data), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn umount(target: *const c_char) -> c_int {
    record(Function::Umount, vec![render_cstr(target)], || real_umount()(target), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn umask(mask: libc::mode_t) -> libc::mode_t {
    record(Function::Umask, vec![format!("{mask:o}")], || real_umask()(mask), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn fcntl(fd: c_int, cmd: c_int, arg: libc::c_long) -> c_int {
    let params = vec![fd.to_string(), cmd.to_string()];
    record(Function::Fcntl, params, || real_fcntl()(fd, cmd, arg), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn ioctl(fd: c_int, request: libc::c_ulong, arg: libc::c_long) -> c_int {
    let params = vec![fd.to_string(), request.to_string()];
    record(Function::Ioctl, params, || real_ioctl()(fd, request, arg), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn getcwd(buf: *mut c_char, size: libc::size_t) -> *mut c_char {
    let params = vec![render_ptr(buf as *const c_void), size.to_string()];
    record(Function::Getcwd, params, || real_getcwd()(buf, size), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn chdir(path: *const c_char) -> c_int {
    record(Function::Chdir, vec![render_cstr(path)], || real_chdir()(path), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn opendir(path: *const c_char) -> *mut libc::DIR {
    record(Function::Opendir, vec![render_cstr(path)], || real_opendir()(path), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn readdir(dirp: *mut libc::DIR) -> *mut libc::dirent {
    let params = vec![render_ptr(dirp as *const c_void)];
    record(Function::Readdir, params, || real_readdir()(dirp), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn closedir(dirp: *mut libc::DIR) -> c_int {
    record(Function::Closedir, vec![render_ptr(dirp as *const c_void)], || real_closedir()(dirp), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn pipe(fds: *mut c_int) -> c_int {
    record(Function::Pipe, vec![render_ptr(fds as *const c_void)], || real_pipe()(fds), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn sync() {
    let _ = begin(Function::Sync, Vec::new());
    real_sync()();
    finish(Function::Sync, 0);
}

#[no_mangle]
pub unsafe extern "C" fn fork() -> libc::pid_t {
    record(Function::Fork, Vec::new(), || real_fork()(), |r| *r as i64)
}

#[no_mangle]
pub unsafe extern "C" fn execve(path: *const c_char, argv: *const *const c_char, envp: *const *const c_char) -> c_int {
    let params = vec![render_cstr(path)];
    record(Function::Execve, params, || real_execve()(path, argv, envp), |r| *r as i64)
}
