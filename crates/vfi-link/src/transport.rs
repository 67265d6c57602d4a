//! Blocking byte transports carrying the probe protocol.

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vfi_core::errors::{ErrorInfo, VfiError};

/// Blocking, timeout-bounded byte stream to a locally attached device.
///
/// `read` waits at most the current timeout and returns `Ok(0)` when it
/// elapses with no data; transport-level failures map to [`VfiError::Io`].
pub trait Transport {
    /// Writes the whole buffer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), VfiError>;

    /// Reads up to `buf.len()` bytes within the current timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, VfiError>;

    /// Discards any buffered input.
    fn clear_input(&mut self) -> Result<(), VfiError>;

    /// Current read timeout.
    fn timeout(&self) -> Duration;

    /// Replaces the read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), VfiError>;
}

/// Serial link parameters for the probe device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial port path of the probe.
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate.
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Default read timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_timeout_ms() -> u64 {
    1_000
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn io_err(code: &str, err: impl ToString) -> VfiError {
    VfiError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Serial-port transport for a locally attached probe.
///
/// The port is owned exclusively and closed when the transport drops.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Opens `path` at the given baud rate with the default read timeout.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, VfiError> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|err| {
                VfiError::Io(
                    ErrorInfo::new("link.open", err.to_string())
                        .with_context("port", path)
                        .with_hint("check the device path and that no other process holds the port"),
                )
            })?;
        Ok(Self { port })
    }

    /// Opens the port described by a [`LinkConfig`].
    pub fn open_config(config: &LinkConfig) -> Result<Self, VfiError> {
        Self::open(
            &config.port,
            config.baud,
            Duration::from_millis(config.timeout_ms),
        )
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), VfiError> {
        self.port
            .write_all(bytes)
            .map_err(|err| io_err("link.write", err))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, VfiError> {
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(io_err("link.read", err)),
        }
    }

    fn clear_input(&mut self) -> Result<(), VfiError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|err| io_err("link.clear", err))
    }

    fn timeout(&self) -> Duration {
        self.port.timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), VfiError> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| io_err("link.set_timeout", err))
    }
}

#[cfg(feature = "mock")]
pub mod mock {
    //! Scripted in-memory transport for protocol tests.

    use std::collections::VecDeque;
    use std::time::Duration;

    use vfi_core::errors::VfiError;

    use super::Transport;

    enum ScriptItem {
        Bytes(VecDeque<u8>),
        TimeoutOnce,
    }

    /// Transport replaying canned device responses.
    ///
    /// Scripted chunks represent future device output, so `clear_input` does
    /// not consume them; it only counts. An exhausted script reads as a
    /// silent device (every read times out).
    pub struct MockTransport {
        script: VecDeque<ScriptItem>,
        /// Every byte written by the client, in order.
        pub written: Vec<u8>,
        /// History of timeouts applied via `set_timeout`.
        pub timeouts_set: Vec<Duration>,
        /// Number of `clear_input` calls.
        pub clears: usize,
        timeout: Duration,
    }

    impl MockTransport {
        /// Empty script; every read times out.
        pub fn new() -> Self {
            Self {
                script: VecDeque::new(),
                written: Vec::new(),
                timeouts_set: Vec::new(),
                clears: 0,
                timeout: Duration::from_secs(1),
            }
        }

        /// Appends bytes the fake device will produce.
        pub fn reply(mut self, bytes: &[u8]) -> Self {
            self.push_reply(bytes);
            self
        }

        /// Appends one read that times out before producing data.
        pub fn reply_timeout(mut self) -> Self {
            self.script.push_back(ScriptItem::TimeoutOnce);
            self
        }

        /// Appends bytes to an already-built script.
        pub fn push_reply(&mut self, bytes: &[u8]) {
            self.script
                .push_back(ScriptItem::Bytes(bytes.iter().copied().collect()));
        }

        /// Drains and returns everything written so far.
        pub fn take_written(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.written)
        }

        /// True once the whole script has been consumed.
        pub fn script_exhausted(&self) -> bool {
            self.script.is_empty()
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for MockTransport {
        fn write_all(&mut self, bytes: &[u8]) -> Result<(), VfiError> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, VfiError> {
            match self.script.pop_front() {
                None => Ok(0),
                Some(ScriptItem::TimeoutOnce) => Ok(0),
                Some(ScriptItem::Bytes(mut bytes)) => {
                    let mut filled = 0;
                    while filled < buf.len() {
                        match bytes.pop_front() {
                            Some(byte) => {
                                buf[filled] = byte;
                                filled += 1;
                            }
                            None => break,
                        }
                    }
                    if !bytes.is_empty() {
                        self.script.push_front(ScriptItem::Bytes(bytes));
                    }
                    Ok(filled)
                }
            }
        }

        fn clear_input(&mut self) -> Result<(), VfiError> {
            self.clears += 1;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<(), VfiError> {
            self.timeouts_set.push(timeout);
            self.timeout = timeout;
            Ok(())
        }
    }
}
