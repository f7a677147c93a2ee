//! Connectionless delivery of protocol lines.

use std::io::Write;
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, UnixAddr};

use crate::error::{LinkError, LinkResult};

/// Pause between connect attempts while the listener's backlog is full.
const CONNECT_RETRY_PAUSE: Duration = Duration::from_millis(5);

/// Delivers one line per call over a fresh connection.
///
/// No application-level reply is read; success means the write completed.
pub trait Transport: Send + Sync {
    fn deliver(&self, line: &str, timeout: Duration) -> LinkResult<()>;

    /// Human-readable endpoint for log messages.
    fn endpoint(&self) -> String;
}

/// Unix domain socket at a fixed filesystem path.
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    path: PathBuf,
}

impl UnixSocketTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for UnixSocketTransport {
    fn deliver(&self, line: &str, timeout: Duration) -> LinkResult<()> {
        if !self.path.exists() {
            return Err(LinkError::ConnectionUnavailable {
                path: self.path.clone(),
                reason: "socket not found".to_string(),
            });
        }

        // A zero timeout is rejected by the OS
        let timeout = timeout.max(Duration::from_millis(1));
        let mut stream = connect_within(&self.path, timeout)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| LinkError::from_attempt(self.path.clone(), e))?;

        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');

        stream
            .write_all(payload.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| LinkError::from_attempt(self.path.clone(), e))?;

        let _ = stream.shutdown(Shutdown::Write);
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}

/// Connect to `path`, giving up with `SendTimeout` once `timeout` has passed.
///
/// The socket is non-blocking while connecting. A listener that is not accepting
/// answers with EAGAIN until a backlog slot frees up.
fn connect_within(path: &Path, timeout: Duration) -> LinkResult<UnixStream> {
    let unavailable = |e: Errno| LinkError::from_attempt(path.to_path_buf(), e.into());
    let deadline = Instant::now() + timeout;

    let addr = UnixAddr::new(path).map_err(unavailable)?;
    let fd = socket(
        AddressFamily::Unix,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(unavailable)?;

    loop {
        match connect(fd.as_raw_fd(), &addr) {
            Ok(()) | Err(Errno::EISCONN) => break,
            Err(Errno::EAGAIN | Errno::EINPROGRESS | Errno::EALREADY | Errno::EINTR) => {
                if Instant::now() >= deadline {
                    return Err(LinkError::SendTimeout {
                        path: path.to_path_buf(),
                    });
                }
                thread::sleep(CONNECT_RETRY_PAUSE);
            }
            Err(e) => return Err(unavailable(e)),
        }
    }

    let stream = UnixStream::from(fd);
    stream
        .set_nonblocking(false)
        .map_err(|e| LinkError::from_attempt(path.to_path_buf(), e))?;
    Ok(stream)
}
