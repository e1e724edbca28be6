//! Internal utilities for streaming command output to logs.
//!
//! This module reads from stdout/stderr pipes, logs each line as it
//! arrives, and returns everything that was read so the caller can
//! inspect it after the command completes.

use std::io::{BufRead, BufReader, Read};

use super::OutputMode;

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe, logging each line and capturing it.
///
/// - In `Stream` mode stdout is logged at INFO and stderr at WARN.
/// - In `Quiet` mode every line is logged at TRACE.
/// - Binary data uses lossy UTF-8 conversion.
/// - I/O errors stop reading but don't fail command execution; whatever
///   was read so far is returned.
pub(super) fn capture_pipe<R: Read>(
    pipe: Option<R>,
    stream_type: StreamType,
    mode: OutputMode,
) -> String {
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return String::new();
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();
    let mut captured = String::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line_buf);
                captured.push_str(&text);
                let line = text.trim_end_matches('\n').trim_end_matches('\r');
                log_line(line, stream_type, mode);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }

    captured
}

fn log_line(line: &str, stream_type: StreamType, mode: OutputMode) {
    match (mode, stream_type) {
        (OutputMode::Stream, StreamType::Stdout) => {
            tracing::info!(stream = %stream_type, "{}", line)
        }
        (OutputMode::Stream, StreamType::Stderr) => {
            tracing::warn!(stream = %stream_type, "{}", line)
        }
        (OutputMode::Quiet, _) => tracing::trace!(stream = %stream_type, "{}", line),
    }
}
