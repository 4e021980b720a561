//! # Line Framing
//!
//! Purpose: Encode commands as single lines and split the daemon's reply
//! stream on the prompt boundary.
//!
//! ## Design Principles
//! 1. **Prompt as Delimiter**: Every reply ends with `"\n> "`, the daemon's
//!    interactive prompt; there is no length prefix.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Partial Content Survives**: On end-of-stream the bytes read so far stay
//!    in the caller's buffer next to the error.
//! 4. **Fail Fast**: A command with an embedded newline is rejected before it
//!    can desynchronize the stream.
//!
//! ## Wire Format
//!
//! ```text
//! request:  <command> "\n"
//! reply:    ["\n"] <payload> "\n> "
//! ```

use std::io::{self, Read};

use crate::error::{ClientError, ClientResult};

/// Reply boundary; also the daemon's interactive prompt.
pub const BOUNDARY: &[u8] = b"\n> ";

/// Reads one reply into `buf`, replacing its contents.
///
/// Bytes are consumed one at a time so nothing after the boundary is taken
/// from `reader`. On success the boundary is removed, followed by a single
/// leading newline if present. On end-of-stream before the boundary the
/// error kind is `UnexpectedEof` and `buf` holds the unmodified partial
/// reply.
pub fn read_message<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<()> {
    buf.clear();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before reply boundary",
                ))
            }
            Ok(_) => buf.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }

        if buf.ends_with(BOUNDARY) {
            buf.truncate(buf.len() - BOUNDARY.len());
            if buf.first() == Some(&b'\n') {
                buf.remove(0);
            }
            return Ok(());
        }
    }
}

/// Checks that `command` fits on one line.
pub fn validate_command(command: &str) -> ClientResult<()> {
    if command.contains('\n') {
        return Err(ClientError::InvalidCommand(command.to_string()));
    }
    Ok(())
}

/// Encodes `command` as a request line into the provided buffer.
pub fn encode_command(command: &str, out: &mut Vec<u8>) -> ClientResult<()> {
    validate_command(command)?;
    out.clear();
    out.reserve(command.len() + 1);
    out.extend_from_slice(command.as_bytes());
    out.push(b'\n');
    Ok(())
}

/// Wraps `command` so the daemon evaluates it and appends a newline.
///
/// Some commands print their result without a trailing newline, which
/// would glue the result to the prompt. The daemon escapes the appended
/// newline as `\`, which the caller strips with `strip_eval_artifact`.
pub fn eval_command(command: &str) -> String {
    format!("eval \"$({})\\n\"", command)
}

/// Removes the single trailing `\` left by `eval_command`.
pub fn strip_eval_artifact(reply: &mut Vec<u8>) {
    if reply.last() == Some(&b'\\') {
        reply.pop();
    }
}
