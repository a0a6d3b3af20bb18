//! The shared halves of every wrapped entry point: deciding whether to run
//! for real or fake an error (§4.1 steps 3-4), and the real-symbol lookup
//! used to actually make the call when asked to.

use crate::state::{state, Mode};
use catalog::Function;
use protocol::Message;
use std::ffi::{c_char, c_void, CStr};
use std::os::raw::c_int;

pub enum Outcome {
    RunReal,
    Fake { errno: c_int },
}

/// Runs the notify/control exchange for one call (§4.1 steps 2-4). The
/// caller still owns invoking the real function and reporting its return
/// value via [`finish`].
pub fn begin(function: Function, params: Vec<String>) -> Outcome {
    let shim = state();
    match shim.mode(function) {
        Mode::Silent => Outcome::RunReal,
        Mode::Notify => {
            let reply = shim.send_call(Message::Notify { function: function.name().to_string(), params });
            match reply {
                Ok(Message::Ack) => Outcome::RunReal,
                other => {
                    log::warn!("unexpected reply to NOTIFY({}): {other:?}", function.name());
                    Outcome::RunReal
                }
            }
        }
        Mode::Control => {
            let reply = shim.send_call(Message::Control { function: function.name().to_string(), params });
            match reply {
                Ok(Message::Exec { variant, .. }) if variant != 0 => match catalog::lookup(variant as catalog::VariantCode) {
                    Some(v) => Outcome::Fake { errno: v.errno },
                    None => {
                        log::warn!("harness requested unknown variant {variant} for {}", function.name());
                        Outcome::RunReal
                    }
                },
                other => {
                    log::warn!("unexpected reply to CONTROL({}): {other:?}", function.name());
                    Outcome::RunReal
                }
            }
        }
    }
}

/// Reports the outcome of a call — real or faked — back to the harness
/// (§4.1 step 3: "the real call is then invoked and its return value is
/// sent back in a RETURN message, which is acknowledged before the
/// replacement returns").
pub fn finish(function: Function, retval: i64) {
    let shim = state();
    if shim.mode(function) == Mode::Silent {
        return;
    }
    let _ = shim.send_return(retval);
}

pub fn set_errno(errno: c_int) {
    unsafe { *libc::__errno_location() = errno };
}

/// Renders a possibly-null C string the way §6 specifies: a quoted string,
/// verbatim, no escaping.
pub unsafe fn render_cstr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return "NULL".to_string();
    }
    let s = unsafe { CStr::from_ptr(ptr) }.to_string_lossy();
    format!("\"{s}\"")
}

pub fn render_ptr(ptr: *const c_void) -> String {
    format!("{:#x}", ptr as usize)
}

/// Resolves the real implementation behind `name` via the dynamic loader's
/// "next symbol" facility (§6), transmuting to the caller's declared
/// function-pointer type. `name` must be a NUL-terminated byte string.
///
/// # Safety
/// `F` must exactly match the real symbol's calling signature.
pub unsafe fn next_symbol<F: Copy>(name: &[u8]) -> F {
    let ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr() as *const c_char) };
    assert!(!ptr.is_null(), "dlsym(RTLD_NEXT) found no real implementation");
    unsafe { std::mem::transmute_copy::<*mut c_void, F>(&ptr) }
}
