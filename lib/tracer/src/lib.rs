//! Per-run loop (§4.3): fork/exec the target with the shim preloaded,
//! accept its connection, drive the message loop, and hand each call to a
//! controller supplied by the caller.
//!
//! Process spawning here is a thin wrapper around [`std::process::Command`]
//! rather than a hand-rolled `posix_spawn` call: unlike the teacher's
//! `ManagedThread::spawn_native` (which juggles `posix_spawn_file_actions_t`
//! to rig up an in-memory shim image), the shim here is just a path on disk,
//! so the standard library's env/argv plumbing is enough.

use catalog::{Function, VariantCode};
use connection::WelcomeEndpoint;
use protocol::Message;
use scheduler::{Call, Run};
use std::ffi::OsStr;
use std::os::unix::net::UnixStream;
use std::process::{Child, Command};
use std::time::Duration;

pub const PRELOAD_ENV_VAR: &str = "LD_PRELOAD";
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("program calls none of selected functions")]
    NoTrackedCalls,
    #[error("failed to exec target program: {0}")]
    Exec(#[source] std::io::Error),
    #[error("unknown function {0:?} named on the wire")]
    UnknownFunction(String),
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
    #[error(transparent)]
    Wire(#[from] protocol::ProtocolError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Receives each call in order and decides the shim's outbound response
/// (§4.3 step 3 "hand the call to the controller").
pub trait CallController {
    /// `is_control` is false for a `NOTIFY`; the returned code is only sent
    /// to the shim when `is_control` is true (a `NOTIFY` always gets `ACK`).
    fn decide(&mut self, call_num: usize, function: Function, params: &[String], is_control: bool) -> VariantCode;

    /// The `depth` to record on the finished run (§3 "Run").
    fn depth(&self) -> usize;
}

/// Forks and execs `argv` with the shim preloaded, accepts its connection,
/// sends `option` as the `OPTION` payload, and drives calls through
/// `controller` until the target exits or the loop's other end conditions
/// are met (§4.3).
pub fn run_once(
    endpoint: &WelcomeEndpoint,
    argv: &[String],
    shim_library_path: impl AsRef<OsStr>,
    socket_path: impl AsRef<OsStr>,
    option: Message,
    controller: &mut dyn CallController,
) -> Result<Run, TracerError> {
    let mut child = spawn_target(argv, shim_library_path, socket_path)?;

    let accepted = endpoint.accept_with_timeout(ACCEPT_TIMEOUT);
    let mut stream = match accepted {
        Ok(stream) => stream,
        Err(connection::ConnectionError::AcceptTimedOut) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TracerError::NoTrackedCalls);
        }
        Err(connection::ConnectionError::Io(e)) => return Err(e.into()),
    };

    let run = drive_session(&mut stream, option, controller)?;
    drop(stream);
    reap(&mut child);
    Ok(run)
}

fn spawn_target(
    argv: &[String],
    shim_library_path: impl AsRef<OsStr>,
    socket_path: impl AsRef<OsStr>,
) -> Result<Child, TracerError> {
    let (program, args) = argv.split_first().ok_or(TracerError::Protocol("empty argv"))?;
    Command::new(program)
        .args(args)
        .env(PRELOAD_ENV_VAR, shim_library_path)
        .env(connection::SOCKET_PATH_ENV_VAR, socket_path)
        .spawn()
        .map_err(TracerError::Exec)
}

fn reap(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => {}
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
        }
        Err(e) => log::warn!("failed to reap target process: {e}"),
    }
}

fn drive_session(
    stream: &mut UnixStream,
    option: Message,
    controller: &mut dyn CallController,
) -> Result<Run, TracerError> {
    match Message::decode(stream)? {
        Message::Init => {}
        _ => return Err(TracerError::Protocol("expected INIT as the first message")),
    }
    option.encode(stream)?;

    let mut run = Run::new();
    let mut call_num = 0usize;

    loop {
        let message = match Message::decode(stream) {
            Ok(m) => m,
            Err(protocol::ProtocolError::Closed) => break,
            Err(e) => return Err(e.into()),
        };

        let (function_name, params, is_control) = match message {
            Message::Notify { function, params } => (function, params, false),
            Message::Control { function, params } => (function, params, true),
            _ => break,
        };
        let function = Function::from_name(&function_name).ok_or_else(|| TracerError::UnknownFunction(function_name.clone()))?;

        let variant = controller.decide(call_num, function, &params, is_control);

        let mut call = Call::new(function, params);
        call.variant = variant;
        run.calls.push(call);

        if is_control {
            Message::Exec { function: function_name, variant: variant as i32 }.encode(stream)?;
        } else {
            Message::Ack.encode(stream)?;
        }

        match Message::decode(stream) {
            Ok(Message::Return { retval }) => {
                run.calls[call_num].retval = Some(retval.to_string());
                Message::Ack.encode(stream)?;
            }
            Ok(_) => return Err(TracerError::Protocol("expected RETURN after CONTROL/NOTIFY")),
            Err(protocol::ProtocolError::Closed) => break,
            Err(e) => return Err(e.into()),
        }

        call_num += 1;
    }

    run.depth = controller.depth();
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Function;
    use std::os::unix::net::UnixStream;
    use std::thread;

    /// Records every call handed to it and always requests the real call
    /// (variant 0), the way a controller watching a notify-only baseline
    /// configuration would.
    struct RecordingController {
        seen: Vec<(usize, Function, bool)>,
    }

    impl CallController for RecordingController {
        fn decide(&mut self, call_num: usize, function: Function, _params: &[String], is_control: bool) -> VariantCode {
            self.seen.push((call_num, function, is_control));
            0
        }

        fn depth(&self) -> usize {
            0
        }
    }

    fn option() -> Message {
        Message::Option { notify: protocol::FunctionList::all(), control: protocol::FunctionList::none() }
    }

    #[test]
    fn drive_session_records_control_and_notify_calls_and_acks_the_notify() {
        let (mut harness_side, mut shim_side) = UnixStream::pair().unwrap();
        let shim = thread::spawn(move || {
            Message::Init.encode(&mut shim_side).unwrap();
            match Message::decode(&mut shim_side).unwrap() {
                Message::Option { .. } => {}
                other => panic!("expected OPTION, got {other:?}"),
            }

            Message::Control { function: "open".into(), params: vec!["\"x\"".into(), "0".into()] }
                .encode(&mut shim_side)
                .unwrap();
            match Message::decode(&mut shim_side).unwrap() {
                Message::Exec { variant, .. } => assert_eq!(variant, 0),
                other => panic!("expected EXEC, got {other:?}"),
            }
            Message::Return { retval: 3 }.encode(&mut shim_side).unwrap();
            assert_eq!(Message::decode(&mut shim_side).unwrap(), Message::Ack);

            Message::Notify { function: "mmap".into(), params: vec!["0x0".into()] }.encode(&mut shim_side).unwrap();
            assert_eq!(Message::decode(&mut shim_side).unwrap(), Message::Ack);
            Message::Return { retval: 0 }.encode(&mut shim_side).unwrap();
            assert_eq!(Message::decode(&mut shim_side).unwrap(), Message::Ack);
        });

        let mut controller = RecordingController { seen: Vec::new() };
        let run = drive_session(&mut harness_side, option(), &mut controller).unwrap();
        shim.join().unwrap();

        assert_eq!(run.calls.len(), 2);
        assert_eq!(run.calls[0].function, Function::Open);
        assert_eq!(run.calls[0].retval.as_deref(), Some("3"));
        assert_eq!(run.calls[1].function, Function::Mmap);
        assert_eq!(run.calls[1].retval.as_deref(), Some("0"));
        assert_eq!(controller.seen, vec![(0, Function::Open, true), (1, Function::Mmap, false)]);
    }

    // spec scenario 6: the target dies right after a CONTROL call's EXEC
    // reply, never sending the RETURN. The partial run up to that call is
    // still handed back rather than treated as an error.
    #[test]
    fn drive_session_finalizes_the_partial_run_when_the_peer_closes_after_exec() {
        let (mut harness_side, mut shim_side) = UnixStream::pair().unwrap();
        let shim = thread::spawn(move || {
            Message::Init.encode(&mut shim_side).unwrap();
            match Message::decode(&mut shim_side).unwrap() {
                Message::Option { .. } => {}
                other => panic!("expected OPTION, got {other:?}"),
            }
            Message::Control { function: "open".into(), params: vec!["\"x\"".into(), "0".into()] }
                .encode(&mut shim_side)
                .unwrap();
            match Message::decode(&mut shim_side).unwrap() {
                Message::Exec { .. } => {}
                other => panic!("expected EXEC, got {other:?}"),
            }
            // process dies here: drop the stream without sending RETURN
        });

        let mut controller = RecordingController { seen: Vec::new() };
        let run = drive_session(&mut harness_side, option(), &mut controller).unwrap();
        shim.join().unwrap();

        assert_eq!(run.calls.len(), 1);
        assert_eq!(run.calls[0].function, Function::Open);
        assert_eq!(run.calls[0].retval, None);
    }

    #[test]
    fn drive_session_rejects_a_non_init_first_message() {
        let (mut harness_side, mut shim_side) = UnixStream::pair().unwrap();
        let shim = thread::spawn(move || {
            Message::Ack.encode(&mut shim_side).unwrap();
        });
        let mut controller = RecordingController { seen: Vec::new() };
        let err = drive_session(&mut harness_side, option(), &mut controller).unwrap_err();
        assert!(matches!(err, TracerError::Protocol(_)));
        shim.join().unwrap();
    }

    #[test]
    fn drive_session_rejects_an_unknown_function_name() {
        let (mut harness_side, mut shim_side) = UnixStream::pair().unwrap();
        let shim = thread::spawn(move || {
            Message::Init.encode(&mut shim_side).unwrap();
            match Message::decode(&mut shim_side).unwrap() {
                Message::Option { .. } => {}
                other => panic!("expected OPTION, got {other:?}"),
            }
            Message::Notify { function: "not_a_real_function".into(), params: vec![] }.encode(&mut shim_side).unwrap();
        });
        let mut controller = RecordingController { seen: Vec::new() };
        let err = drive_session(&mut harness_side, option(), &mut controller).unwrap_err();
        assert!(matches!(err, TracerError::UnknownFunction(name) if name == "not_a_real_function"));
        shim.join().unwrap();
    }
}
