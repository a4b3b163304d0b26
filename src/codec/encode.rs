//! Value serialization
//!
//! Walks the value graph depth-first, tracking every table by
//! identity. A table met a second time is written as a back-reference
//! to its first occurrence, which keeps shared structure shared and
//! lets cyclic graphs serialize finitely.

use std::collections::HashMap;

use crate::buffer::Buffer;
use crate::codec::value::{Table, Value};
use crate::codec::{
    MAX_DEPTH, TAG_BACKREF, TAG_FALSE, TAG_FLOAT, TAG_INT, TAG_STR_LONG, TAG_STR_SHORT,
    TAG_TABLE_16, TAG_TABLE_32, TAG_TABLE_64, TAG_TABLE_8, TAG_TRUE, VERSION_TAG,
};
use crate::error::{CacheError, Result};

/// Serialize a value into a fresh buffer.
pub fn encode(value: &Value) -> Result<Buffer> {
    let mut buf = Buffer::new();
    buf.put_slice(&VERSION_TAG)?;
    let mut seen: HashMap<usize, i64> = HashMap::new();
    encode_value(&mut buf, value, &mut seen, 0)?;
    Ok(buf)
}

fn encode_value(
    buf: &mut Buffer,
    value: &Value,
    seen: &mut HashMap<usize, i64>,
    depth: usize,
) -> Result<()> {
    match value {
        Value::Nil => Err(CacheError::Encode(format!(
            "unsupported type: {}",
            value.type_name()
        ))),
        Value::Bool(false) => buf.put_u8(TAG_FALSE),
        Value::Bool(true) => buf.put_u8(TAG_TRUE),
        Value::Int(n) => {
            buf.put_u8(TAG_INT)?;
            buf.put_i64(*n)
        }
        Value::Float(x) => {
            buf.put_u8(TAG_FLOAT)?;
            buf.put_f64(*x)
        }
        Value::Str(s) => encode_str(buf, s),
        Value::Table(t) => encode_table(buf, t, seen, depth),
    }
}

fn encode_str(buf: &mut Buffer, s: &[u8]) -> Result<()> {
    if s.len() <= u8::MAX as usize {
        buf.put_u8(TAG_STR_SHORT)?;
        buf.put_u8(s.len() as u8)?;
    } else {
        buf.put_u8(TAG_STR_LONG)?;
        buf.put_u64(s.len() as u64)?;
    }
    buf.put_slice(s)
}

fn encode_table(
    buf: &mut Buffer,
    table: &Table,
    seen: &mut HashMap<usize, i64>,
    depth: usize,
) -> Result<()> {
    if let Some(&ordinal) = seen.get(&table.addr()) {
        buf.put_u8(TAG_BACKREF)?;
        return buf.put_i64(ordinal);
    }
    if depth >= MAX_DEPTH {
        return Err(CacheError::Encode("table nesting too deep".to_string()));
    }
    let ordinal = i64::try_from(seen.len() + 1)
        .map_err(|_| CacheError::Encode("too many tables".to_string()))?;
    seen.insert(table.addr(), ordinal);

    let entries = table.raw();

    // Entries with a nil key or value take no slot. The array part is
    // the run of keys 1, 2, 3, ... before the first record entry.
    let mut narr: u64 = 0;
    let mut nrec: u64 = 0;
    for (key, value) in entries.iter() {
        if key.is_nil() || value.is_nil() {
            continue;
        }
        if nrec == 0 && matches!(key, Value::Int(n) if *n >= 1 && *n as u64 == narr + 1) {
            narr += 1;
        } else {
            nrec += 1;
        }
    }

    let (tag, width) = table_width(narr.max(nrec));
    buf.put_u8(tag)?;
    put_count(buf, narr, width)?;
    put_count(buf, nrec, width)?;

    for (key, value) in entries.iter() {
        if key.is_nil() || value.is_nil() {
            continue;
        }
        encode_value(buf, key, seen, depth + 1)?;
        encode_value(buf, value, seen, depth + 1)?;
    }
    Ok(())
}

/// Pick the narrowest count width that fits both sizes.
fn table_width(largest: u64) -> (u8, usize) {
    if largest <= u8::MAX as u64 {
        (TAG_TABLE_8, 1)
    } else if largest <= u16::MAX as u64 {
        (TAG_TABLE_16, 2)
    } else if largest <= u32::MAX as u64 {
        (TAG_TABLE_32, 4)
    } else {
        (TAG_TABLE_64, 8)
    }
}

fn put_count(buf: &mut Buffer, n: u64, width: usize) -> Result<()> {
    match width {
        1 => buf.put_u8(n as u8),
        2 => buf.put_u16(n as u16),
        4 => buf.put_u32(n as u32),
        _ => buf.put_u64(n),
    }
}
