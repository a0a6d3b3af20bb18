//! The welcome endpoint and per-run client connection (§4.3 steps 1-2, §5).
//!
//! The harness binds one `UnixListener` at a well-known path for the whole
//! session and reuses it across runs; each run gets its own `UnixStream`,
//! created at accept and dropped at the end of the run's message loop.

use std::io;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The path the reference harness binds to; configurable in practice, but
/// this is what a bare invocation uses (§4.3).
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/analyserSocket";

/// Environment variable the harness sets on the target process so the shim
/// connects to the same path the welcome endpoint was actually bound at,
/// rather than assuming [`DEFAULT_SOCKET_PATH`]. Must match the shim's own
/// `SOCKET_PATH_ENV_VAR` (they can't share a dependency: the shim is a
/// `cdylib` only, not linkable as a normal crate).
pub const SOCKET_PATH_ENV_VAR: &str = "ANALYSER_SOCKET_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("no tracked call was issued within the accept window")]
    AcceptTimedOut,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The harness's listening side of the socket (§5 "Shared resources").
pub struct WelcomeEndpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl WelcomeEndpoint {
    /// Binds at `path`, unlinking any stale socket file left behind by a
    /// prior crashed session first.
    pub fn bind(path: impl AsRef<Path>) -> Result<WelcomeEndpoint, ConnectionError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ConnectionError::Io(e)),
        }
        let listener = UnixListener::bind(&path)?;
        log::debug!("welcome endpoint bound at {}", path.display());
        Ok(WelcomeEndpoint { listener, path })
    }

    /// Accepts one client connection, or returns [`ConnectionError::AcceptTimedOut`]
    /// once `timeout` elapses with nobody connecting (§4.3 step 2).
    pub fn accept_with_timeout(&self, timeout: Duration) -> Result<UnixStream, ConnectionError> {
        self.listener.set_nonblocking(true)?;
        let fd = self.listener.as_raw_fd();
        let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        self.listener.set_nonblocking(false)?;
        if ready < 0 {
            return Err(ConnectionError::Io(io::Error::last_os_error()));
        }
        if ready == 0 {
            return Err(ConnectionError::AcceptTimedOut);
        }
        let (stream, _addr) = self.listener.accept()?;
        Ok(stream)
    }
}

impl Drop for WelcomeEndpoint {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("analyser-test-{}-{}.sock", std::process::id(), name))
    }

    #[test]
    fn accepts_a_client_that_connects_before_the_timeout() {
        let path = scratch_path("accepts");
        let endpoint = WelcomeEndpoint::bind(&path).unwrap();
        let connector_path = path.clone();
        let connector = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut stream = UnixStream::connect(&connector_path).unwrap();
            stream.write_all(b"hi").unwrap();
        });
        let stream = endpoint.accept_with_timeout(Duration::from_secs(2)).unwrap();
        drop(stream);
        connector.join().unwrap();
    }

    #[test]
    fn reports_timeout_when_nobody_connects() {
        let path = scratch_path("timeout");
        let endpoint = WelcomeEndpoint::bind(&path).unwrap();
        let err = endpoint.accept_with_timeout(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, ConnectionError::AcceptTimedOut));
    }

    #[test]
    fn bind_removes_a_stale_socket_file_left_by_a_crashed_session() {
        let path = scratch_path("stale");
        std::fs::write(&path, b"not a socket").unwrap();
        let endpoint = WelcomeEndpoint::bind(&path).unwrap();
        drop(endpoint);
    }
}
