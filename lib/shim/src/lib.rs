//! `LD_PRELOAD` shim: replaces libc entry points with wrappers that report
//! each call to the harness over a Unix socket and, when told to, return a
//! faked error instead of running the real call (§4.1).
//!
//! State is process-global (design note "Global shim state" — one socket,
//! one function table, built once by whichever wrapped call runs first) so
//! every wrapper, regardless of which thread calls it, shares one session.

mod controllable;
mod dispatch;
mod notify;
mod shimlogger;
mod state;

pub use state::{DEFAULT_SOCKET_PATH, SOCKET_PATH_ENV_VAR};
