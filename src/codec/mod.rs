//! Self-describing binary value codec
//!
//! Serialized form (all integers big-endian):
//!
//! ```text
//! +-------------+--------------------------------------------+
//! | version (4) | one tagged value                           |
//! +-------------+--------------------------------------------+
//!
//! 0x01  false           no payload
//! 0x41  true            no payload
//! 0x03  float           8-byte IEEE-754
//! 0x43  integer         8-byte two's complement
//! 0x04  long string     8-byte length, then bytes (length > 255)
//! 0x44  short string    1-byte length, then bytes (length <= 255)
//! 0x05  table           narr, nrec, then narr+nrec key/value pairs
//!   0x15 / 0x25 / 0x35    same with 16/32/64-bit counts
//! 0x45  back-reference  8-byte 1-based table ordinal
//! ```
//!
//! Every table is registered for back-references before its members
//! are visited, so shared and cyclic structures serialize finitely and
//! reconstruct with identity preserved.

mod decode;
mod encode;
mod value;

pub use decode::{decode, decode_slice};
pub use encode::encode;
pub use value::{Table, Value};

use crate::buffer::Buffer;
use crate::error::Result;

/// Serializer signature; [`encode`] is the default.
pub type EncodeFn = fn(&Value) -> Result<Buffer>;

/// Deserializer signature; [`decode`] is the default.
pub type DecodeFn = fn(&mut Buffer) -> Result<Value>;

/// Four-byte signature prefixed to every serialized value.
pub const VERSION_TAG: [u8; 4] = *b"LM\xF6\x02";

/// Maximum table nesting accepted on both encode and decode.
pub const MAX_DEPTH: usize = 1024;

// Type tags. Bit 0x40 marks the variant form of a kind (true vs false,
// integer vs float, short vs long string, back-reference vs table);
// bits 0x30 carry the table count width.
pub(crate) const TAG_FALSE: u8 = 0x01;
pub(crate) const TAG_TRUE: u8 = 0x41;
pub(crate) const TAG_FLOAT: u8 = 0x03;
pub(crate) const TAG_INT: u8 = 0x43;
pub(crate) const TAG_STR_LONG: u8 = 0x04;
pub(crate) const TAG_STR_SHORT: u8 = 0x44;
pub(crate) const TAG_TABLE_8: u8 = 0x05;
pub(crate) const TAG_TABLE_16: u8 = 0x15;
pub(crate) const TAG_TABLE_32: u8 = 0x25;
pub(crate) const TAG_TABLE_64: u8 = 0x35;
pub(crate) const TAG_BACKREF: u8 = 0x45;
