//! Value deserialization
//!
//! Reads the serialized form back into a value graph. Every table is
//! recorded in encounter order before its members are decoded, so a
//! back-reference always resolves to a table that already exists, even
//! one still under construction (cycles).

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::codec::value::{Table, Value};
use crate::codec::{
    MAX_DEPTH, TAG_BACKREF, TAG_FALSE, TAG_FLOAT, TAG_INT, TAG_STR_LONG, TAG_STR_SHORT,
    TAG_TABLE_16, TAG_TABLE_32, TAG_TABLE_64, TAG_TABLE_8, TAG_TRUE, VERSION_TAG,
};
use crate::error::{CacheError, Result};

/// Deserialize one value, consuming the buffer's unread bytes exactly.
pub fn decode(buf: &mut Buffer) -> Result<Value> {
    if buf.remaining() < VERSION_TAG.len() || buf.get_slice(VERSION_TAG.len())? != VERSION_TAG {
        return Err(CacheError::Version);
    }
    let mut tables: Vec<Table> = Vec::new();
    let value = decode_value(buf, &mut tables, 0)?;
    if buf.remaining() != 0 {
        return Err(CacheError::Corrupt("extra data in buffer".to_string()));
    }
    Ok(value)
}

/// Deserialize one value from a raw byte slice.
pub fn decode_slice(data: &[u8]) -> Result<Value> {
    decode(&mut Buffer::from(data))
}

fn decode_value(buf: &mut Buffer, tables: &mut Vec<Table>, depth: usize) -> Result<Value> {
    let tag = buf.get_u8()?;
    match tag {
        TAG_FALSE => Ok(Value::Bool(false)),
        TAG_TRUE => Ok(Value::Bool(true)),
        TAG_FLOAT => Ok(Value::Float(buf.get_f64()?)),
        TAG_INT => Ok(Value::Int(buf.get_i64()?)),
        TAG_STR_SHORT => {
            let len = buf.get_u8()? as usize;
            Ok(Value::Str(Bytes::copy_from_slice(buf.get_slice(len)?)))
        }
        TAG_STR_LONG => {
            let len = buf.get_i64()?;
            if len < 0 {
                return Err(CacheError::Corrupt("bad string size".to_string()));
            }
            let len = usize::try_from(len).map_err(|_| CacheError::Underflow)?;
            Ok(Value::Str(Bytes::copy_from_slice(buf.get_slice(len)?)))
        }
        TAG_TABLE_8 => decode_table(buf, tables, depth, 1),
        TAG_TABLE_16 => decode_table(buf, tables, depth, 2),
        TAG_TABLE_32 => decode_table(buf, tables, depth, 4),
        TAG_TABLE_64 => decode_table(buf, tables, depth, 8),
        TAG_BACKREF => {
            let ordinal = buf.get_i64()?;
            if ordinal < 1 || ordinal as u64 > tables.len() as u64 {
                return Err(CacheError::Corrupt("bad back-reference".to_string()));
            }
            Ok(Value::Table(tables[(ordinal - 1) as usize].clone()))
        }
        other => Err(CacheError::Corrupt(format!(
            "unknown type tag {:#04x}",
            other
        ))),
    }
}

fn decode_table(
    buf: &mut Buffer,
    tables: &mut Vec<Table>,
    depth: usize,
    width: usize,
) -> Result<Value> {
    if depth >= MAX_DEPTH {
        return Err(CacheError::Corrupt("table nesting too deep".to_string()));
    }
    let narr = get_count(buf, width)?;
    let nrec = get_count(buf, width)?;
    let total = narr
        .checked_add(nrec)
        .ok_or_else(|| CacheError::Corrupt("bad table size".to_string()))?;

    // Counts come off the wire; cap the preallocation and let pushes
    // grow the rest.
    let table = Table::with_capacity(total.min(1024) as usize);
    tables.push(table.clone());

    for _ in 0..total {
        let key = decode_value(buf, tables, depth + 1)?;
        let value = decode_value(buf, tables, depth + 1)?;
        table.raw_push(key, value);
    }
    Ok(Value::Table(table))
}

fn get_count(buf: &mut Buffer, width: usize) -> Result<u64> {
    match width {
        1 => Ok(buf.get_u8()? as u64),
        2 => Ok(buf.get_u16()? as u64),
        4 => Ok(buf.get_u32()? as u64),
        _ => {
            let n = buf.get_i64()?;
            if n < 0 {
                return Err(CacheError::Corrupt("bad table size".to_string()));
            }
            Ok(n as u64)
        }
    }
}
