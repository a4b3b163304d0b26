//! Header serialization
//!
//! Builds request headers and parses response headers in the fixed
//! 24-byte layout described in the module docs of [`crate::protocol`].

use crate::protocol::Opcode;

/// Size of a request or response header on the wire.
pub const HEADER_SIZE: usize = 24;

/// First byte of every request.
pub const REQUEST_MAGIC: u8 = 0x80;

/// First byte of every response.
pub const RESPONSE_MAGIC: u8 = 0x81;

/// The request header fields this client fills in.
///
/// Data type, vbucket id and opaque are always sent as zero.
#[derive(Debug, Clone, Copy)]
pub struct RequestHeader {
    pub opcode: Opcode,
    pub key_len: u16,
    pub extras_len: u8,
    pub body_len: u32,
    pub cas: u64,
}

impl RequestHeader {
    /// Serialize into the fixed wire layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0] = REQUEST_MAGIC;
        raw[1] = self.opcode as u8;
        raw[2..4].copy_from_slice(&self.key_len.to_be_bytes());
        raw[4] = self.extras_len;
        // raw[5] data type and raw[6..8] vbucket id stay zero
        raw[8..12].copy_from_slice(&self.body_len.to_be_bytes());
        // raw[12..16] opaque stays zero
        raw[16..24].copy_from_slice(&self.cas.to_be_bytes());
        raw
    }
}

/// A response header as parsed off the wire.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeader {
    pub magic: u8,
    pub opcode: u8,
    pub key_len: u16,
    pub extras_len: u8,
    pub data_type: u8,
    pub status: u16,
    pub body_len: u32,
    pub opaque: u32,
    pub cas: u64,
}

impl ResponseHeader {
    /// Parse the fixed wire layout. Validating the magic byte is the
    /// caller's job.
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Self {
        ResponseHeader {
            magic: raw[0],
            opcode: raw[1],
            key_len: u16::from_be_bytes([raw[2], raw[3]]),
            extras_len: raw[4],
            data_type: raw[5],
            status: u16::from_be_bytes([raw[6], raw[7]]),
            body_len: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            opaque: u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]),
            cas: u64::from_be_bytes([
                raw[16], raw[17], raw[18], raw[19], raw[20], raw[21], raw[22], raw[23],
            ]),
        }
    }
}
