//! Connection Handler
//!
//! Owns the TCP socket to the cache server. The socket is lazy:
//! nothing is opened until a command needs it, and a failed socket is
//! dropped and reopened on the next command. When reconnecting is
//! disabled, the first socket failure closes the connection for good.

use std::fmt;
use std::io::{IoSlice, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Socket open and usable
    Connected,

    /// No socket; the next command will connect
    Disconnected,

    /// Terminal; every command fails
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnState::Connected => "connected",
            ConnState::Disconnected => "disconnected",
            ConnState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A lazily connected client socket
#[derive(Debug)]
pub struct Connection {
    /// Server host name or address
    host: String,

    /// Server port (numeric)
    port: String,

    /// Timeout applied while connecting
    timeout: Duration,

    /// Reopen the socket on the next command after a failure
    reconnect: bool,

    /// Open socket, if any
    stream: Option<TcpStream>,

    /// Terminal flag; once set the connection refuses all commands
    closed: bool,
}

impl Connection {
    /// Create a connection handle. No socket is opened yet.
    pub fn new(host: String, port: String, timeout: Duration, reconnect: bool) -> Self {
        Connection {
            host,
            port,
            timeout,
            reconnect,
            stream: None,
            closed: false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnState {
        if self.closed {
            ConnState::Closed
        } else if self.stream.is_some() {
            ConnState::Connected
        } else {
            ConnState::Disconnected
        }
    }

    /// Open the socket if it is not open already
    pub fn ensure_connected(&mut self) -> Result<()> {
        self.socket().map(|_| ())
    }

    /// Drop the socket without an I/O error (used when the response
    /// stream can no longer be trusted). Downgrades like any failure.
    pub fn force_disconnect(&mut self) {
        self.drop_socket();
    }

    /// Close for good: drop the socket and refuse further commands.
    pub fn mark_closed(&mut self) {
        self.stream = None;
        self.closed = true;
    }

    // =========================================================================
    // I/O
    // =========================================================================

    /// Send one buffer fully
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let result = self.socket()?.write_all(data);
        self.check_io(result)
    }

    /// Send several buffers with as few writes as the OS allows
    pub fn send_vectored(&mut self, bufs: &mut [IoSlice<'_>]) -> Result<()> {
        let result = write_all_vectored(self.socket()?, bufs);
        self.check_io(result)
    }

    /// Receive exactly `buf.len()` bytes. A clean close by the peer
    /// surfaces as an I/O error.
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let result = self.socket()?.read_exact(buf);
        self.check_io(result)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn socket(&mut self) -> Result<&mut TcpStream> {
        if self.closed {
            return Err(CacheError::Closed);
        }
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        self.stream.as_mut().ok_or(CacheError::Closed)
    }

    fn connect(&self) -> Result<TcpStream> {
        let port: u16 = self.port.parse().map_err(|_| CacheError::Resolve {
            host: self.host.clone(),
            port: self.port.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "port is not numeric"),
        })?;

        let candidates: Vec<_> = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| CacheError::Resolve {
                host: self.host.clone(),
                port: self.port.clone(),
                source: e,
            })?
            .collect();

        tracing::debug!(
            "connecting to {}:{} ({} candidate addresses)",
            self.host,
            self.port,
            candidates.len()
        );

        let mut last_err: Option<std::io::Error> = None;
        for addr in candidates {
            match self.try_candidate(&addr) {
                Ok(stream) => {
                    tracing::debug!("connected to {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(CacheError::Connect {
            host: self.host.clone(),
            port: self.port.clone(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no addresses resolved")
            }),
        })
    }

    /// Dial and prepare one candidate address. Failures discard the
    /// candidate. The socket keeps blocking semantics with no read or
    /// write deadline.
    fn try_candidate(&self, addr: &SocketAddr) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(addr, self.timeout)?;
        // Disable Nagle's algorithm; requests are small
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Apply the failure policy to an I/O result: any error drops the
    /// socket and downgrades the connection before it is surfaced.
    fn check_io<T>(&mut self, result: std::io::Result<T>) -> Result<T> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!("socket error on {}:{}: {}", self.host, self.port, e);
                self.drop_socket();
                Err(CacheError::Io(e))
            }
        }
    }

    fn drop_socket(&mut self) {
        self.stream = None;
        if !self.reconnect {
            self.closed = true;
        }
    }
}

/// Write every byte of every slice, advancing across partial writes
/// and retrying interrupted ones.
fn write_all_vectored(stream: &mut TcpStream, mut bufs: &mut [IoSlice<'_>]) -> std::io::Result<()> {
    let mut remaining: usize = bufs.iter().map(|b| b.len()).sum();
    while remaining > 0 {
        match stream.write_vectored(bufs) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "socket closed",
                ));
            }
            Ok(n) => {
                remaining -= n;
                IoSlice::advance_slices(&mut bufs, n);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
