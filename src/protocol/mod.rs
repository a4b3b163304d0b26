//! Protocol Module
//!
//! The binary wire protocol spoken with the cache server.
//!
//! ## Framing
//!
//! Requests and responses share a fixed 24-byte header followed by an
//! optional body of extras, key and value (all integers big-endian):
//!
//! ```text
//! ┌────────────┬────────────┬─────────────────────────┐
//! │ magic (1)  │ opcode (1) │     key length (2)      │
//! ├────────────┼────────────┼─────────────────────────┤
//! │ extras (1) │ dtype (1)  │  vbucket / status (2)   │
//! ├────────────┴────────────┴─────────────────────────┤
//! │               total body length (4)               │
//! ├───────────────────────────────────────────────────┤
//! │                     opaque (4)                    │
//! ├───────────────────────────────────────────────────┤
//! │                      cas (8)                      │
//! │                                                   │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Requests carry magic `0x80`, responses `0x81`. The field at offset
//! 6 is the vbucket id in requests and the status code in responses.
//! The body is laid out extras, then key, then value; the value length
//! is whatever remains after extras and key are subtracted from the
//! total body length.

pub mod header;

pub use header::{RequestHeader, ResponseHeader, HEADER_SIZE, REQUEST_MAGIC, RESPONSE_MAGIC};

/// Largest key the protocol can carry (16-bit length field).
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Set = 0x01,
    Add = 0x02,
    Replace = 0x03,
    Delete = 0x04,
    Increment = 0x05,
    Decrement = 0x06,
    Flush = 0x08,
    Stat = 0x10,
    /// Quit without a response ("quiet" quit)
    QuitQ = 0x17,
}

/// Response status codes the client distinguishes. Anything else is
/// surfaced as a server error.
pub mod status {
    pub const SUCCESS: u16 = 0x0000;
    pub const KEY_NOT_FOUND: u16 = 0x0001;
    pub const KEY_EXISTS: u16 = 0x0002;
    /// Increment/decrement on a value that is not a number
    pub const DELTA_BADVAL: u16 = 0x0006;
}

// =============================================================================
// Request extras
// =============================================================================

/// Extras for Set/Add/Replace: flags (always zero) then expiration.
pub fn store_extras(expiration: u32) -> [u8; 8] {
    let mut extras = [0u8; 8];
    extras[4..8].copy_from_slice(&expiration.to_be_bytes());
    extras
}

/// Extras for Increment/Decrement: delta, initial value, expiration.
pub fn counter_extras(delta: u64, initial: u64, expiration: u32) -> [u8; 20] {
    let mut extras = [0u8; 20];
    extras[0..8].copy_from_slice(&delta.to_be_bytes());
    extras[8..16].copy_from_slice(&initial.to_be_bytes());
    extras[16..20].copy_from_slice(&expiration.to_be_bytes());
    extras
}

/// Extras for Flush: seconds until the flush takes effect.
pub fn flush_extras(expiration: u32) -> [u8; 4] {
    expiration.to_be_bytes()
}
