//! Value model for the cache codec
//!
//! A [`Value`] is one of six shapes: nil, boolean, 64-bit integer,
//! 64-bit float, byte string, or table. Tables are ordered key/value
//! entry lists behind a shared handle, so cloning a [`Table`] aliases
//! the same storage. That aliasing is what lets one table appear in
//! several places of a value graph, including inside itself.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;

/// A single cacheable value.
///
/// `Nil` stands for an absent value. It can be placed in a table (such
/// entries are skipped during serialization) but is rejected as a
/// top-level value by the encoder, and the decoder never produces it.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Bytes),
    Table(Table),
}

impl Value {
    /// True for `Value::Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Byte-string contents, when this value is a string.
    pub fn as_str(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Human-readable name of this value's shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Str(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Str(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Str(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(v)
    }
}

/// Ordered key/value entry list behind a shared handle.
///
/// `Clone` produces another handle to the same entries; use
/// [`Table::ptr_eq`] to test whether two handles share storage.
/// Entry order is encounter order and is preserved through
/// serialization.
#[derive(Clone, Default)]
pub struct Table {
    entries: Rc<RefCell<Vec<(Value, Value)>>>,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Table::default()
    }

    /// Create an empty table with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Table {
            entries: Rc::new(RefCell::new(Vec::with_capacity(capacity))),
        }
    }

    /// Build a table from raw entries, kept verbatim in order.
    pub fn from_entries(entries: Vec<(Value, Value)>) -> Self {
        Table {
            entries: Rc::new(RefCell::new(entries)),
        }
    }

    /// Number of entries, including any with a nil key or value.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Set `key` to `value`, replacing an existing entry with a
    /// matching key or appending a new one.
    ///
    /// Table keys match by identity, scalar keys structurally. A nil
    /// key is ignored; a nil value removes the entry.
    pub fn set(&self, key: Value, value: Value) {
        if key.is_nil() {
            return;
        }
        let mut entries = self.entries.borrow_mut();
        let found = entries.iter().rposition(|(k, _)| key_matches(k, &key));
        match (found, value.is_nil()) {
            (Some(i), true) => {
                entries.remove(i);
            }
            (Some(i), false) => entries[i].1 = value,
            (None, true) => {}
            (None, false) => entries.push((key, value)),
        }
    }

    /// Append `value` at the next free 1-based integer index. A nil
    /// value is ignored.
    pub fn push(&self, value: Value) {
        if value.is_nil() {
            return;
        }
        let mut index: i64 = 1;
        while self.get(&Value::Int(index)).is_some() {
            index += 1;
        }
        self.set(Value::Int(index), value);
    }

    /// Look up `key`, cloning the value. The newest matching entry
    /// wins; a nil key or nil value reads as absent.
    pub fn get(&self, key: &Value) -> Option<Value> {
        if key.is_nil() {
            return None;
        }
        let entries = self.entries.borrow();
        for (k, v) in entries.iter().rev() {
            if key_matches(k, key) {
                if v.is_nil() {
                    return None;
                }
                return Some(v.clone());
            }
        }
        None
    }

    /// Snapshot of all entries in order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries.borrow().clone()
    }

    /// True when both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    pub(crate) fn raw(&self) -> Ref<'_, Vec<(Value, Value)>> {
        self.entries.borrow()
    }

    pub(crate) fn raw_push(&self, key: Value, value: Value) {
        self.entries.borrow_mut().push((key, value));
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.entries) as usize
    }
}

/// Structural equality over entry lists.
///
/// Compares entries pairwise in order, recursing into nested tables.
/// Does not terminate on cyclic graphs that are not handle-identical;
/// use [`Table::ptr_eq`] for those.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.entries.borrow() == *other.entries.borrow()
    }
}

/// Prints identity and size, never the contents, so cyclic tables
/// format safely.
impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entries.try_borrow() {
            Ok(entries) => write!(
                f,
                "table: {:p} ({} entries)",
                Rc::as_ptr(&self.entries),
                entries.len()
            ),
            Err(_) => write!(f, "table: {:p} (borrowed)", Rc::as_ptr(&self.entries)),
        }
    }
}

/// Key matching: tables by identity, scalars structurally, nil never.
fn key_matches(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Table(x), Value::Table(y)) => x.ptr_eq(y),
        (Value::Nil, _) | (_, Value::Nil) => false,
        _ => a == b,
    }
}
