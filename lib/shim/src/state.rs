//! Global shim state (§4.1, design note "Global shim state"): one socket,
//! one function table, created once per target process by the first
//! intercepted call.

use catalog::{Function, ALL_FUNCTIONS};
use protocol::{ListKind, Message};
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::sync::{Mutex, OnceLock};

/// Matches the harness's default; overridable so tests (and anyone running
/// more than one session on a box) don't collide on the well-known path.
pub const SOCKET_PATH_ENV_VAR: &str = "ANALYSER_SOCKET_PATH";
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/analyserSocket";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Silent,
    Notify,
    Control,
}

pub struct ShimState {
    connection: Mutex<BufReader<UnixStream>>,
    writer: Mutex<BufWriter<UnixStream>>,
    fun_list: [Mode; ALL_FUNCTIONS.len()],
}

static STATE: OnceLock<ShimState> = OnceLock::new();

/// Returns the process-wide shim state, performing the one-time INIT/OPTION
/// handshake (§4.1 steps 1-2) on first call.
pub fn state() -> &'static ShimState {
    STATE.get_or_init(|| {
        crate::shimlogger::install();
        ShimState::connect().unwrap_or_else(|e| {
            // A shim that can't reach the harness has nothing useful left to
            // do; this mirrors the "Socket" error kind aborting the session,
            // just from the target-process side of the wire.
            eprintln!("shim: failed to connect to harness: {e}");
            std::process::abort();
        })
    })
}

impl ShimState {
    fn connect() -> std::io::Result<ShimState> {
        let path = std::env::var(SOCKET_PATH_ENV_VAR).unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string());
        let stream = UnixStream::connect(&path)?;
        let writer_stream = stream.try_clone()?;
        let mut reader = BufReader::new(stream);
        let mut writer = BufWriter::new(writer_stream);

        Message::Init.encode(&mut writer).map_err(to_io)?;
        let option = Message::decode(&mut reader).map_err(to_io)?;
        let (notify, control) = match option {
            Message::Option { notify, control } => (notify, control),
            _ => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected OPTION")),
        };

        let mut fun_list = [Mode::Silent; ALL_FUNCTIONS.len()];
        for &f in ALL_FUNCTIONS {
            if selected(&control.kind, &control.names, f) {
                fun_list[f.id() as usize] = Mode::Control;
            } else if selected(&notify.kind, &notify.names, f) {
                fun_list[f.id() as usize] = Mode::Notify;
            }
        }

        Ok(ShimState { connection: Mutex::new(reader), writer: Mutex::new(writer), fun_list })
    }

    pub fn mode(&self, function: Function) -> Mode {
        self.fun_list[function.id() as usize]
    }

    /// Sends `NOTIFY`/`CONTROL`, waits for the matching `ACK`/`EXEC`. Holds
    /// both halves of the connection locked for the duration: the protocol
    /// is strictly request-response, so there is never contention from a
    /// single-threaded target (§5).
    pub fn send_call(&self, message: Message) -> std::io::Result<Message> {
        let mut writer = self.writer.lock().unwrap();
        message.encode(&mut *writer).map_err(to_io)?;
        drop(writer);
        let mut reader = self.connection.lock().unwrap();
        Message::decode(&mut *reader).map_err(to_io)
    }

    pub fn send_return(&self, retval: i64) -> std::io::Result<()> {
        {
            let mut writer = self.writer.lock().unwrap();
            Message::Return { retval }.encode(&mut *writer).map_err(to_io)?;
        }
        let mut reader = self.connection.lock().unwrap();
        match Message::decode(&mut *reader).map_err(to_io)? {
            Message::Ack => Ok(()),
            _ => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected ACK after RETURN")),
        }
    }
}

fn selected(kind: &ListKind, names: &[String], function: Function) -> bool {
    match kind {
        ListKind::All => true,
        ListKind::None => false,
        ListKind::Include => names.iter().any(|n| n == function.name()),
    }
}

fn to_io(e: protocol::ProtocolError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}
