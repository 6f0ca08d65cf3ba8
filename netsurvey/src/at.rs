//! Line oriented AT command transport.
//!
//! Writes a command terminated by `\r` and collects the information lines the
//! modem sends back until it reports one of the final result codes of
//! 3GPP TS 27.007 (`OK`, `ERROR`, `+CME ERROR`, `+CMS ERROR`, `NO CARRIER`).

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AtError {
    #[error("serial I/O error")]
    Io(#[from] io::Error),
    #[error("serial port closed while waiting for response to {command}")]
    Closed { command: String },
    #[error("timed out after {timeout:?} waiting for response to {command}")]
    Timeout { command: String, timeout: Duration },
    #[error("{command} returned ERROR")]
    Failed { command: String },
    #[error("{command} returned +CME ERROR: {error}")]
    Cme { command: String, error: String },
    #[error("{command} returned +CMS ERROR: {error}")]
    Cms { command: String, error: String },
    #[error("{command} returned NO CARRIER")]
    NoCarrier { command: String },
}

/// An information line that did not have the expected shape.
#[derive(Debug, Error)]
#[error("malformed {prefix} response: {response:?}")]
pub struct ParseError {
    pub prefix: &'static str,
    pub response: String,
}

impl ParseError {
    pub fn new(prefix: &'static str, response: impl Into<String>) -> Self {
        Self {
            prefix,
            response: response.into(),
        }
    }
}

/// Maps a final result code to the outcome of `command`, `None` for
/// information lines.
fn final_result(line: &str, command: &str) -> Option<Result<(), AtError>> {
    let command = command.to_string();
    match line {
        "OK" => Some(Ok(())),
        "ERROR" => Some(Err(AtError::Failed { command })),
        "NO CARRIER" => Some(Err(AtError::NoCarrier { command })),
        _ => {
            if let Some(error) = line.strip_prefix("+CME ERROR:") {
                let error = error.trim().to_string();
                Some(Err(AtError::Cme { command, error }))
            } else {
                line.strip_prefix("+CMS ERROR:").map(|error| {
                    let error = error.trim().to_string();
                    Err(AtError::Cms { command, error })
                })
            }
        }
    }
}

/// AT command channel over any byte stream, usually a serial port.
///
/// A read timeout reported by the underlying port is not an error, the
/// response is awaited until the per command deadline instead.
///
/// After a command timed out, its response may still arrive. The next
/// command first drains the port until it goes quiet.
pub struct AtPort<T> {
    port: T,
    buf: Vec<u8>,
    needs_resync: bool,
}

impl<T: Read + Write> AtPort<T> {
    pub fn new(port: T) -> Self {
        Self {
            port,
            buf: Vec::with_capacity(1024),
            needs_resync: false,
        }
    }

    /// Sends `command` and returns its information lines.
    pub fn command(&mut self, command: &str) -> Result<Vec<String>, AtError> {
        self.execute(command, command, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn command_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, AtError> {
        self.execute(command, command, timeout)
    }

    /// Like [`AtPort::command`], but only `label` ever shows up in logs and
    /// errors. Used for commands carrying credentials.
    pub fn sensitive_command(
        &mut self,
        command: &str,
        label: &str,
    ) -> Result<Vec<String>, AtError> {
        self.execute(command, label, DEFAULT_COMMAND_TIMEOUT)
    }

    fn execute(
        &mut self,
        command: &str,
        label: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, AtError> {
        debug!("Sending AT command: {}", label);
        if self.needs_resync {
            self.drain()?;
            self.needs_resync = false;
        }
        // anything left over is an unsolicited result code or a late response
        if !self.buf.is_empty() {
            debug!(stale = %String::from_utf8_lossy(&self.buf), "Discarding stale input");
            self.buf.clear();
        }

        self.port.write_all(format!("{command}\r").as_bytes())?;
        self.port.flush()?;

        let response = self.read_response(command, label, timeout);
        if matches!(response, Err(AtError::Timeout { .. })) {
            self.needs_resync = true;
        }

        response
    }

    fn read_response(
        &mut self,
        command: &str,
        label: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, AtError> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();

        loop {
            let line = self.read_line(label, timeout, deadline)?;
            if line.is_empty() || line == command {
                continue;
            }

            match final_result(&line, label) {
                Some(Ok(())) => {
                    debug!(response = ?lines, "AT command {} succeeded", label);
                    return Ok(lines);
                }
                Some(Err(err)) => {
                    warn!("AT command returned error: {}", err);
                    return Err(err);
                }
                None => lines.push(line),
            }
        }
    }

    /// Reads into the buffer until one read returns no data.
    fn drain(&mut self) -> Result<(), AtError> {
        let deadline = Instant::now() + DEFAULT_COMMAND_TIMEOUT;
        let mut chunk = [0u8; 256];

        while Instant::now() < deadline {
            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        warn!("Port kept sending data while resynchronizing");

        Ok(())
    }

    fn read_line(
        &mut self,
        label: &str,
        timeout: Duration,
        deadline: Instant,
    ) -> Result<String, AtError> {
        let mut chunk = [0u8; 256];

        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&raw).trim().to_string());
            }

            if Instant::now() >= deadline {
                return Err(AtError::Timeout {
                    command: label.to_string(),
                    timeout,
                });
            }

            match self.port.read(&mut chunk) {
                Ok(0) => {
                    return Err(AtError::Closed {
                        command: label.to_string(),
                    });
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Payload of the first information line starting with `prefix`, e.g.
/// `0,1` for prefix `+CREG:` on line `+CREG: 0,1`.
pub fn information<'a>(lines: &'a [String], prefix: &str) -> Option<&'a str> {
    lines
        .iter()
        .find_map(|line| line.strip_prefix(prefix))
        .map(str::trim)
}
