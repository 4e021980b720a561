//! # Raw Connection
//!
//! Purpose: Own one TCP stream to the daemon and run single commands on it,
//! with no locking and no reconnection.
//!
//! ## Design Principles
//! 1. **Banner on Open**: A connection is only handed out after the welcome
//!    banner has been read, so the first command sees a clean stream.
//! 2. **Buffer Reuse**: Request and reply buffers live on the connection.
//! 3. **Errors as Data**: End-of-stream becomes `ClientError::Disconnected`
//!    with the partial reply attached; the layer above decides what to do.
//! 4. **Transport Deadlines**: Timeouts are socket options set once at open.

use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::framing::{encode_command, eval_command, read_message, strip_eval_artifact, validate_command};

/// Default remote-control port of the daemon.
pub const DEFAULT_PORT: u16 = 36330;

/// Default daemon address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:36330";

/// Configuration for a session and its connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Daemon address, e.g. "127.0.0.1:36330".
    pub addr: String,
    /// Optional TCP read timeout. `None` blocks until the daemon replies.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: DEFAULT_ADDR.to_string(),
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
        }
    }
}

/// Single TCP connection with reusable buffers.
pub struct Connection {
    // Buffered reader keeps the byte-at-a-time boundary scan off the syscall path.
    reader: BufReader<TcpStream>,
    reply_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    /// Dials the daemon and discards its welcome banner.
    pub fn open(config: &ClientConfig) -> ClientResult<Self> {
        let connect_err = |source: io::Error| ClientError::Connect {
            addr: config.addr.clone(),
            source,
        };

        let stream = connect_stream(config)?;
        configure_stream(&stream, config).map_err(connect_err)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            reply_buf: Vec::with_capacity(4 * 1024),
            write_buf: Vec::with_capacity(256),
        };
        read_message(&mut conn.reader, &mut conn.reply_buf).map_err(connect_err)?;
        debug!(addr = %config.addr, banner_len = conn.reply_buf.len(), "connected");
        Ok(conn)
    }

    /// Sends `command` and returns the reply, borrowed from the connection.
    ///
    /// An empty command returns an empty reply without touching the wire,
    /// since the daemon does not answer empty lines.
    pub fn exec(&mut self, command: &str) -> ClientResult<&[u8]> {
        validate_command(command)?;
        if command.is_empty() {
            self.reply_buf.clear();
            return Ok(&self.reply_buf);
        }

        encode_command(command, &mut self.write_buf)?;
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        match read_message(&mut self.reader, &mut self.reply_buf) {
            Ok(()) => {
                debug!(command, reply_len = self.reply_buf.len(), "command done");
                Ok(&self.reply_buf)
            }
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Err(ClientError::Disconnected {
                partial: std::mem::take(&mut self.reply_buf),
            }),
            Err(err) => Err(ClientError::Io(err)),
        }
    }

    /// Runs `command` through the daemon's `eval`, for commands whose output
    /// lacks a trailing newline.
    pub fn exec_eval(&mut self, command: &str) -> ClientResult<&[u8]> {
        validate_command(command)?;
        if command.is_empty() {
            self.reply_buf.clear();
            return Ok(&self.reply_buf);
        }

        self.exec(&eval_command(command))?;
        strip_eval_artifact(&mut self.reply_buf);
        Ok(&self.reply_buf)
    }

    /// Closes both directions of the stream.
    pub fn shutdown(&self) {
        // NotConnected just means the daemon closed first.
        if let Err(err) = self.reader.get_ref().shutdown(Shutdown::Both) {
            if err.kind() != io::ErrorKind::NotConnected {
                debug!(error = %err, "shutdown failed");
            }
        }
    }
}

fn resolve(addr: &str) -> ClientResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(addr.to_string()))?
        .next()
        .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))
}

fn connect_stream(config: &ClientConfig) -> ClientResult<TcpStream> {
    let addr = resolve(&config.addr)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
        None => TcpStream::connect(addr),
    };
    stream.map_err(|source| ClientError::Connect {
        addr: config.addr.clone(),
        source,
    })
}

fn configure_stream(stream: &TcpStream, config: &ClientConfig) -> io::Result<()> {
    if let Some(timeout) = config.read_timeout {
        stream.set_read_timeout(Some(timeout))?;
    }
    if let Some(timeout) = config.write_timeout {
        stream.set_write_timeout(Some(timeout))?;
    }
    // Commands are tiny; do not let Nagle hold them back.
    stream.set_nodelay(true)
}
