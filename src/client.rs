//! Cache client
//!
//! The command surface over the binary wire protocol. Every command is
//! one request/response round trip on a single exclusively owned
//! connection:
//!
//! ```text
//!   set(key, value)                      get(key)
//!        │                                   ▲
//!        ▼                                   │
//!   ┌─────────┐    ┌──────────────┐    ┌──────────┐
//!   │ encode  │───▶│ request frame│    │  decode  │
//!   └─────────┘    └──────┬───────┘    └────▲─────┘
//!                         ▼                 │
//!                  ┌──────────────┐   ┌─────┴────────┐
//!                  │  Connection  │──▶│response frame│
//!                  └──────────────┘   └──────────────┘
//! ```
//!
//! Absent keys, stale CAS tokens and non-numeric counters come back as
//! `None`; only transport, protocol and unexpected server statuses are
//! errors.

use std::collections::HashMap;
use std::fmt;
use std::io::IoSlice;
use std::time::Duration;

use crate::buffer::{Buffer, MAX_CAPACITY};
use crate::codec::{DecodeFn, EncodeFn, Value};
use crate::config::ClientConfig;
use crate::error::{CacheError, Result};
use crate::network::{ConnState, Connection};
use crate::protocol::{
    counter_extras, flush_extras, status, store_extras, Opcode, RequestHeader, ResponseHeader,
    HEADER_SIZE, MAX_KEY_SIZE, RESPONSE_MAGIC,
};

/// A synchronous cache client.
///
/// Commands connect lazily, run one at a time, and repair a dropped
/// connection on the next call (unless reconnecting is disabled).
/// Dropping the client closes it.
#[derive(Debug)]
pub struct Client {
    conn: Connection,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// One parsed response frame.
struct ServerResponse {
    status: u16,
    cas: u64,
    key: Vec<u8>,
    value: Buffer,
}

impl Client {
    /// Create a client from configuration. No connection is made until
    /// the first command.
    pub fn open(config: ClientConfig) -> Result<Client> {
        if config.timeout_ms == 0 {
            return Err(CacheError::Argument("timeout must be positive".to_string()));
        }
        let conn = Connection::new(
            config.host,
            config.port,
            Duration::from_millis(config.timeout_ms),
            config.reconnect,
        );
        Ok(Client {
            conn,
            encode: config.encode,
            decode: config.decode,
        })
    }

    /// Current connection state
    pub fn state(&self) -> ConnState {
        self.conn.state()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Fetch `key`. Returns the decoded value and its CAS token, or
    /// `None` when the key does not exist.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<(Value, u64)>> {
        check_key(key)?;
        tracing::trace!("get {:?}", String::from_utf8_lossy(key));
        let mut response = self.roundtrip(Opcode::Get, key, &[], &[], 0)?;
        match response.status {
            status::SUCCESS => {
                let value = (self.decode)(&mut response.value)?;
                Ok(Some((value, response.cas)))
            }
            status::KEY_NOT_FOUND => Ok(None),
            other => Err(CacheError::Server(other)),
        }
    }

    /// Store `value` under `key`; a `None` value deletes the key
    /// instead. `expiration` is in seconds (0 = never). Pass the CAS
    /// token from an earlier fetch to make the operation conditional
    /// (0 = unconditional). Returns the new CAS token, or `None` when
    /// the server rejected the operation (key missing or token stale).
    pub fn set(
        &mut self,
        key: &[u8],
        value: Option<&Value>,
        expiration: u32,
        cas: u64,
    ) -> Result<Option<u64>> {
        match value {
            Some(value) => self.store(Opcode::Set, key, value, expiration, cas),
            None => self.delete(key, cas),
        }
    }

    /// Store `value` only if `key` does not exist yet. Otherwise as
    /// [`Client::set`].
    pub fn add(
        &mut self,
        key: &[u8],
        value: &Value,
        expiration: u32,
        cas: u64,
    ) -> Result<Option<u64>> {
        self.store(Opcode::Add, key, value, expiration, cas)
    }

    /// Store `value` only if `key` already exists. Otherwise as
    /// [`Client::set`].
    pub fn replace(
        &mut self,
        key: &[u8],
        value: &Value,
        expiration: u32,
        cas: u64,
    ) -> Result<Option<u64>> {
        self.store(Opcode::Replace, key, value, expiration, cas)
    }

    /// Add `delta` to the counter at `key`, creating it at `initial`
    /// when absent. Returns the new counter value, or `None` when the
    /// key is missing or holds something that is not a number.
    pub fn increment(
        &mut self,
        key: &[u8],
        delta: u64,
        initial: u64,
        expiration: u32,
    ) -> Result<Option<u64>> {
        self.counter(Opcode::Increment, key, delta, initial, expiration)
    }

    /// Subtract `delta` from the counter at `key`; the server stops at
    /// zero rather than wrapping. Otherwise as [`Client::increment`].
    pub fn decrement(
        &mut self,
        key: &[u8],
        delta: u64,
        initial: u64,
        expiration: u32,
    ) -> Result<Option<u64>> {
        self.counter(Opcode::Decrement, key, delta, initial, expiration)
    }

    /// Invalidate every key on the server, after `expiration` seconds
    /// (0 = immediately).
    pub fn flush(&mut self, expiration: u32) -> Result<()> {
        tracing::trace!("flush (delay {}s)", expiration);
        let extras = flush_extras(expiration);
        let response = self.roundtrip(Opcode::Flush, &[], &extras, &[], 0)?;
        match response.status {
            status::SUCCESS => Ok(()),
            other => Err(CacheError::Server(other)),
        }
    }

    /// Fetch server statistics, all of them or the group named by
    /// `key`.
    pub fn stats(&mut self, key: Option<&[u8]>) -> Result<HashMap<String, String>> {
        let key = key.unwrap_or(&[]);
        if !key.is_empty() {
            check_key(key)?;
        }
        tracing::trace!("stats {:?}", String::from_utf8_lossy(key));
        self.send_request(Opcode::Stat, key, &[], &[], 0)?;

        // One request, many responses; a frame with neither name nor
        // value terminates the stream.
        let mut stats = HashMap::new();
        loop {
            let response = self.receive_response()?;
            if response.status != status::SUCCESS {
                return Err(CacheError::Server(response.status));
            }
            if response.key.is_empty() && response.value.is_empty() {
                break;
            }
            if response.key.is_empty() || response.value.is_empty() {
                self.conn.force_disconnect();
                return Err(CacheError::Protocol(
                    "stats response with only one of name and value".to_string(),
                ));
            }
            stats.insert(
                String::from_utf8_lossy(&response.key).into_owned(),
                String::from_utf8_lossy(response.value.as_slice()).into_owned(),
            );
        }
        Ok(stats)
    }

    /// Close the client. An open socket is asked to quit first, then
    /// dropped. Idempotent; every later command fails with `Closed`.
    pub fn close(&mut self) {
        if self.state() == ConnState::Closed {
            return;
        }
        tracing::debug!("closing client");
        if self.state() == ConnState::Connected {
            self.quit();
        }
        self.conn.mark_closed();
    }

    // =========================================================================
    // Shared command bodies
    // =========================================================================

    fn store(
        &mut self,
        opcode: Opcode,
        key: &[u8],
        value: &Value,
        expiration: u32,
        cas: u64,
    ) -> Result<Option<u64>> {
        check_key(key)?;
        let encoded = (self.encode)(value)?;
        tracing::trace!(
            "{:?} {:?} ({} bytes)",
            opcode,
            String::from_utf8_lossy(key),
            encoded.len()
        );
        let extras = store_extras(expiration);
        let response = self.roundtrip(opcode, key, &extras, encoded.as_slice(), cas)?;
        match response.status {
            status::SUCCESS => Ok(Some(response.cas)),
            status::KEY_NOT_FOUND | status::KEY_EXISTS => Ok(None),
            other => Err(CacheError::Server(other)),
        }
    }

    fn delete(&mut self, key: &[u8], cas: u64) -> Result<Option<u64>> {
        check_key(key)?;
        tracing::trace!("delete {:?}", String::from_utf8_lossy(key));
        let response = self.roundtrip(Opcode::Delete, key, &[], &[], cas)?;
        match response.status {
            status::SUCCESS => Ok(Some(response.cas)),
            status::KEY_NOT_FOUND | status::KEY_EXISTS => Ok(None),
            other => Err(CacheError::Server(other)),
        }
    }

    fn counter(
        &mut self,
        opcode: Opcode,
        key: &[u8],
        delta: u64,
        initial: u64,
        expiration: u32,
    ) -> Result<Option<u64>> {
        check_key(key)?;
        tracing::trace!(
            "{:?} {:?} by {}",
            opcode,
            String::from_utf8_lossy(key),
            delta
        );
        let extras = counter_extras(delta, initial, expiration);
        let mut response = self.roundtrip(opcode, key, &extras, &[], 0)?;
        match response.status {
            status::SUCCESS => {
                if response.value.len() != 8 {
                    return Err(CacheError::Protocol(format!(
                        "counter response body is {} bytes, expected 8",
                        response.value.len()
                    )));
                }
                Ok(Some(response.value.get_u64()?))
            }
            status::KEY_NOT_FOUND | status::DELTA_BADVAL => Ok(None),
            other => Err(CacheError::Server(other)),
        }
    }

    /// Ask the server to drop the connection, without waiting for an
    /// answer.
    fn quit(&mut self) {
        let header = RequestHeader {
            opcode: Opcode::QuitQ,
            key_len: 0,
            extras_len: 0,
            body_len: 0,
            cas: 0,
        };
        let _ = self.conn.send(&header.to_bytes());
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn roundtrip(
        &mut self,
        opcode: Opcode,
        key: &[u8],
        extras: &[u8],
        value: &[u8],
        cas: u64,
    ) -> Result<ServerResponse> {
        self.send_request(opcode, key, extras, value, cas)?;
        self.receive_response()
    }

    fn send_request(
        &mut self,
        opcode: Opcode,
        key: &[u8],
        extras: &[u8],
        value: &[u8],
        cas: u64,
    ) -> Result<()> {
        let body_len = u32::try_from(extras.len() + key.len() + value.len())
            .map_err(|_| CacheError::Encode("encoded value too long".to_string()))?;
        let header = RequestHeader {
            opcode,
            key_len: key.len() as u16,
            extras_len: extras.len() as u8,
            body_len,
            cas,
        };
        let raw = header.to_bytes();
        let mut segments = [
            IoSlice::new(&raw),
            IoSlice::new(extras),
            IoSlice::new(key),
            IoSlice::new(value),
        ];
        self.conn.send_vectored(&mut segments)
    }

    fn receive_response(&mut self) -> Result<ServerResponse> {
        let mut raw = [0u8; HEADER_SIZE];
        self.conn.receive_exact(&mut raw)?;

        if raw[0] != RESPONSE_MAGIC {
            self.conn.force_disconnect();
            return Err(CacheError::Protocol(format!(
                "bad response magic 0x{:02x}",
                raw[0]
            )));
        }
        let header = ResponseHeader::parse(&raw);

        let body_len = header.body_len as usize;
        if body_len > MAX_CAPACITY {
            self.conn.force_disconnect();
            return Err(CacheError::Protocol(format!(
                "response body of {} bytes is too large",
                body_len
            )));
        }
        let mut body = vec![0u8; body_len];
        self.conn.receive_exact(&mut body)?;

        let extras_len = header.extras_len as usize;
        let key_len = header.key_len as usize;
        if body_len < extras_len + key_len {
            self.conn.force_disconnect();
            return Err(CacheError::Protocol(format!(
                "response lengths are inconsistent (body {}, extras {}, key {})",
                body_len, extras_len, key_len
            )));
        }

        tracing::trace!(
            "response: opcode 0x{:02x}, status 0x{:04x}, {} body bytes",
            header.opcode,
            header.status,
            body_len
        );

        Ok(ServerResponse {
            status: header.status,
            cas: header.cas,
            key: body[extras_len..extras_len + key_len].to_vec(),
            value: Buffer::from_vec(body[extras_len + key_len..].to_vec()),
        })
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cachewire [{}]", self.state())
    }
}

/// Keys must fit the protocol's 16-bit length field and cannot be
/// empty.
fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        return Err(CacheError::Argument(format!(
            "bad key length {}",
            key.len()
        )));
    }
    Ok(())
}
