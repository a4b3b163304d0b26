//! Growable byte buffer used by the codec and the network layer
//!
//! A `Buffer` owns a contiguous run of bytes with a single read cursor:
//!
//! ```text
//!   +----------------+----------------+----------------+
//!   |    consumed    |     unread     |   spare room   |
//!   +----------------+----------------+----------------+
//!   0            position           len()        capacity()
//! ```
//!
//! Writes append at the end and grow the backing storage on demand.
//! Growth doubles while the buffer is small and switches to 50% steps
//! past [`DOUBLE_THRESHOLD`] so large payloads do not over-allocate.
//! Capacity never exceeds the buffer's limit ([`MAX_CAPACITY`] unless
//! built with [`Buffer::with_limit`]); a write that would cross the
//! limit fails with [`CacheError::Overflow`] and leaves the buffer
//! untouched. All multi-byte accessors are big-endian, matching both
//! the value codec and the wire protocol.

use crate::error::{CacheError, Result};

/// Capacity given to an empty buffer on its first write (1 KiB).
pub const INITIAL_CAPACITY: usize = 1024;

/// Below this capacity the buffer doubles when it grows; at or above
/// it, capacity grows by 50% instead (64 KiB).
pub const DOUBLE_THRESHOLD: usize = 64 * 1024;

/// Default ceiling on buffer capacity (256 MiB).
pub const MAX_CAPACITY: usize = 256 * 1024 * 1024;

/// Growable byte buffer with a read cursor.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    pos: usize,
    limit: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

impl Buffer {
    /// Create an empty buffer with the default capacity limit. No
    /// allocation happens until the first write.
    pub fn new() -> Self {
        Buffer {
            data: Vec::new(),
            pos: 0,
            limit: MAX_CAPACITY,
        }
    }

    /// Create an empty buffer with room for `capacity` bytes already
    /// allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Buffer::new();
        buf.require(capacity)?;
        Ok(buf)
    }

    /// Create an empty buffer with a custom capacity ceiling.
    pub fn with_limit(limit: usize) -> Self {
        Buffer {
            data: Vec::new(),
            pos: 0,
            limit,
        }
    }

    /// Wrap an existing byte vector, read cursor at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Buffer {
            data,
            pos: 0,
            limit: MAX_CAPACITY,
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of valid bytes in the buffer (consumed and unread).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current allocated capacity.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Position of the read cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// All valid bytes, including those already consumed.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Drop all contents and rewind the cursor. Capacity is kept.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Consume the buffer, returning the backing vector.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Ensure room for `extra` more bytes beyond the current length.
    ///
    /// Fails with [`CacheError::Overflow`] when the required size would
    /// exceed the buffer's limit and with [`CacheError::Alloc`] when
    /// the allocator refuses. The buffer is unchanged on failure.
    pub fn require(&mut self, extra: usize) -> Result<()> {
        let needed = self
            .data
            .len()
            .checked_add(extra)
            .ok_or(CacheError::Overflow)?;
        if needed > self.limit {
            return Err(CacheError::Overflow);
        }
        if needed <= self.data.capacity() {
            return Ok(());
        }

        let mut target = self.data.capacity().max(INITIAL_CAPACITY);
        while target < needed {
            target = if target < DOUBLE_THRESHOLD {
                target.saturating_mul(2)
            } else {
                target.saturating_add(target / 2)
            };
        }
        let target = target.min(self.limit);

        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| CacheError::Alloc)?;
        Ok(())
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Append a single byte.
    pub fn put_u8(&mut self, v: u8) -> Result<()> {
        self.require(1)?;
        self.data.push(v);
        Ok(())
    }

    /// Append a big-endian `u16`.
    pub fn put_u16(&mut self, v: u16) -> Result<()> {
        self.put_slice(&v.to_be_bytes())
    }

    /// Append a big-endian `u32`.
    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        self.put_slice(&v.to_be_bytes())
    }

    /// Append a big-endian `u64`.
    pub fn put_u64(&mut self, v: u64) -> Result<()> {
        self.put_slice(&v.to_be_bytes())
    }

    /// Append a big-endian two's complement `i64`.
    pub fn put_i64(&mut self, v: i64) -> Result<()> {
        self.put_slice(&v.to_be_bytes())
    }

    /// Append a big-endian IEEE-754 `f64`.
    pub fn put_f64(&mut self, v: f64) -> Result<()> {
        self.put_u64(v.to_bits())
    }

    /// Append a slice of bytes.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        self.require(src.len())?;
        self.data.extend_from_slice(src);
        Ok(())
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Read a single byte, advancing the cursor.
    pub fn get_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(CacheError::Underflow);
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Read a big-endian `u16`, advancing the cursor.
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.get_array()?))
    }

    /// Read a big-endian `u32`, advancing the cursor.
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.get_array()?))
    }

    /// Read a big-endian `u64`, advancing the cursor.
    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.get_array()?))
    }

    /// Read a big-endian two's complement `i64`, advancing the cursor.
    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.get_array()?))
    }

    /// Read a big-endian IEEE-754 `f64`, advancing the cursor.
    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    /// Read `n` bytes, advancing the cursor.
    pub fn get_slice(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(CacheError::Underflow);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    fn get_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(CacheError::Underflow);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Buffer::from_vec(data)
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Buffer::from_vec(data.to_vec())
    }
}
