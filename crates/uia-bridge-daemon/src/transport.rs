//! Newline-delimited JSON-RPC over any reader/writer pair.

use std::io::BufRead;
use std::io::Read;
use std::io::Write;

use thiserror::Error;
use tracing::debug;
use tracing::warn;
use uia_bridge_ipc::RpcRequest;
use uia_bridge_ipc::RpcResponse;
use uia_bridge_ipc::error_codes;

use crate::executor::ScriptExecutor;
use crate::router::Router;
use crate::router::parse_error_response;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Request size limit exceeded (max {max_bytes} bytes)")]
    SizeLimit { max_bytes: usize },
    #[error("Connection timeout")]
    Timeout,
    #[error("Connection closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout,
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::BrokenPipe => {
                Self::ConnectionClosed
            }
            _ => Self::Io(err),
        }
    }
}

/// Reads lines of at most `max_size` bytes. An oversized line is consumed and
/// reported, and reading continues with the next line.
struct SizeLimitedReader<R> {
    inner: R,
    max_size: usize,
}

impl<R: BufRead> SizeLimitedReader<R> {
    fn new(inner: R, max_size: usize) -> Self {
        Self { inner, max_size }
    }

    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut buf = Vec::new();
        let limit = self.max_size as u64 + 1;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if n as u64 == limit {
            self.skip_line()?;
            return Err(TransportError::SizeLimit {
                max_bytes: self.max_size,
            });
        }

        String::from_utf8(buf)
            .map(Some)
            .map_err(|e| TransportError::Parse(e.to_string()))
    }

    fn skip_line(&mut self) -> Result<(), TransportError> {
        let mut discard = Vec::new();
        loop {
            discard.clear();
            let n = (&mut self.inner)
                .take(64 * 1024)
                .read_until(b'\n', &mut discard)?;
            if n == 0 || discard.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}

fn write_response<W: Write>(writer: &mut W, response: &RpcResponse) -> Result<(), TransportError> {
    let json = serde_json::to_string(response)
        .map_err(|e| TransportError::Parse(format!("Failed to serialize response: {}", e)))?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;
    Ok(())
}

/// Serve requests until the reader is exhausted. Each request line gets
/// exactly one response line, in order.
pub fn serve_lines<R, W, E>(
    reader: R,
    mut writer: W,
    router: &Router<'_, E>,
    max_request_bytes: usize,
) -> Result<(), TransportError>
where
    R: BufRead,
    W: Write,
    E: ScriptExecutor,
{
    let mut reader = SizeLimitedReader::new(reader, max_request_bytes);

    loop {
        let line = match reader.read_line() {
            Ok(None) | Err(TransportError::ConnectionClosed) => break,
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => line,
            Err(TransportError::SizeLimit { max_bytes }) => {
                warn!(max_bytes, "Rejected oversized request");
                let response = RpcResponse::error(
                    0,
                    error_codes::INVALID_REQUEST,
                    &format!("Request size limit exceeded ({} bytes max)", max_bytes),
                );
                write_response(&mut writer, &response)?;
                continue;
            }
            Err(TransportError::Parse(msg)) => {
                write_response(&mut writer, &parse_error_response(&msg))?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => router.route(request),
            Err(e) => {
                debug!(error = %e, "Unparseable request line");
                parse_error_response(&e.to_string())
            }
        };

        match write_response(&mut writer, &response) {
            Ok(()) => {}
            Err(TransportError::ConnectionClosed) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
