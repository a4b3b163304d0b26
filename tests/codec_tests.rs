//! Codec unit tests
//!
//! Exercises the value model, exact wire bytes for every tag, table
//! classification, shared-table back-references and decode validation.

use cachewire::codec::VERSION_TAG;
use cachewire::{decode, decode_slice, encode, Buffer, CacheError, Table, Value};

/// Version header followed by the given payload bytes.
fn wire(payload: &[u8]) -> Vec<u8> {
    let mut bytes = VERSION_TAG.to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

fn round_trip(value: &Value) -> Value {
    let mut buf = encode(value).unwrap();
    decode(&mut buf).unwrap()
}

// ==================== Scalar wire format ====================

#[test]
fn test_version_header() {
    let encoded = encode(&Value::Bool(false)).unwrap();
    assert_eq!(&encoded.as_slice()[..4], b"LM\xF6\x02");
}

#[test]
fn test_encode_booleans() {
    let encoded = encode(&Value::Bool(false)).unwrap();
    assert_eq!(encoded.as_slice(), wire(&[0x01]));

    let encoded = encode(&Value::Bool(true)).unwrap();
    assert_eq!(encoded.as_slice(), wire(&[0x41]));
}

#[test]
fn test_encode_integer() {
    let encoded = encode(&Value::Int(3)).unwrap();
    assert_eq!(
        encoded.as_slice(),
        wire(&[0x43, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03])
    );

    // Negative values keep their two's-complement bytes.
    let encoded = encode(&Value::Int(-1)).unwrap();
    assert_eq!(
        encoded.as_slice(),
        wire(&[0x43, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])
    );
}

#[test]
fn test_encode_float() {
    let encoded = encode(&Value::Float(1.0)).unwrap();
    assert_eq!(
        encoded.as_slice(),
        wire(&[0x03, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    );
}

#[test]
fn test_encode_short_string() {
    let encoded = encode(&Value::from("hi")).unwrap();
    assert_eq!(encoded.as_slice(), wire(&[0x44, 0x02, b'h', b'i']));

    let encoded = encode(&Value::from("")).unwrap();
    assert_eq!(encoded.as_slice(), wire(&[0x44, 0x00]));
}

#[test]
fn test_encode_long_string() {
    // 255 bytes still fits the short form; 256 switches to the long one.
    let encoded = encode(&Value::from("a".repeat(255))).unwrap();
    assert_eq!(&encoded.as_slice()[4..6], &[0x44, 0xFF]);
    assert_eq!(encoded.len(), 4 + 2 + 255);

    let encoded = encode(&Value::from("a".repeat(256))).unwrap();
    let mut expected = wire(&[0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
    expected.extend_from_slice(&[b'a'; 256]);
    assert_eq!(encoded.as_slice(), expected);
}

#[test]
fn test_encode_nil_fails() {
    let err = encode(&Value::Nil).unwrap_err();
    assert!(matches!(err, CacheError::Encode(_)));
    assert!(err.to_string().contains("unsupported"));
}

// ==================== Scalar round trips ====================

#[test]
fn test_round_trip_scalars() {
    let values = vec![
        Value::Bool(false),
        Value::Bool(true),
        Value::Int(0),
        Value::Int(1),
        Value::Int(-1),
        Value::Int(i64::MAX),
        Value::Int(i64::MIN),
        Value::Float(0.0),
        Value::Float(-1.5),
        Value::Float(f64::MAX),
        Value::Float(f64::INFINITY),
        Value::Float(f64::NEG_INFINITY),
        Value::from(""),
        Value::from("x"),
        Value::from("x".repeat(255)),
        Value::from("x".repeat(256)),
        Value::from("x".repeat(65536)),
        Value::from(&b"\x00\xFF\x80"[..]),
    ];
    for value in values {
        assert_eq!(round_trip(&value), value, "round trip of {:?}", value);
    }
}

#[test]
fn test_round_trip_nan() {
    let decoded = round_trip(&Value::Float(f64::NAN));
    match decoded {
        Value::Float(x) => assert!(x.is_nan()),
        _ => panic!("Expected Float, got {:?}", decoded),
    }
}

#[test]
fn test_round_trip_negative_zero() {
    let decoded = round_trip(&Value::Float(-0.0));
    match decoded {
        Value::Float(x) => assert_eq!(x.to_bits(), (-0.0f64).to_bits()),
        _ => panic!("Expected Float, got {:?}", decoded),
    }
}

// ==================== Table classification ====================

#[test]
fn test_encode_empty_table() {
    let encoded = encode(&Value::Table(Table::new())).unwrap();
    assert_eq!(encoded.as_slice(), wire(&[0x05, 0x00, 0x00]));
}

#[test]
fn test_encode_array_and_record_parts() {
    let table = Table::new();
    table.set(Value::Int(1), Value::from("a"));
    table.set(Value::Int(2), Value::from("b"));
    table.set(Value::from("k"), Value::from("v"));

    let mut expected = wire(&[0x05, 0x02, 0x01]); // narr 2, nrec 1
    expected.push(0x43);
    expected.extend_from_slice(&1i64.to_be_bytes());
    expected.extend_from_slice(&[0x44, 0x01, b'a']);
    expected.push(0x43);
    expected.extend_from_slice(&2i64.to_be_bytes());
    expected.extend_from_slice(&[0x44, 0x01, b'b']);
    expected.extend_from_slice(&[0x44, 0x01, b'k']);
    expected.extend_from_slice(&[0x44, 0x01, b'v']);
    assert_eq!(encode(&Value::Table(table)).unwrap().as_slice(), expected);
}

#[test]
fn test_record_entry_ends_array_run() {
    // Once a record entry appears, later integer keys no longer extend
    // the array part.
    let table = Table::new();
    table.set(Value::from("k"), Value::from("v"));
    table.set(Value::Int(1), Value::from("a"));
    table.set(Value::Int(2), Value::from("b"));

    let encoded = encode(&Value::Table(table)).unwrap();
    assert_eq!(&encoded.as_slice()[4..7], &[0x05, 0x00, 0x03]);
}

#[test]
fn test_array_run_must_be_dense() {
    let table = Table::new();
    table.set(Value::Int(1), Value::from("a"));
    table.set(Value::Int(3), Value::from("c"));

    // The gap at 2 turns the rest into record entries.
    let encoded = encode(&Value::Table(table)).unwrap();
    assert_eq!(&encoded.as_slice()[4..7], &[0x05, 0x01, 0x01]);
}

#[test]
fn test_nil_entries_take_no_slot() {
    let table = Table::from_entries(vec![
        (Value::Int(1), Value::from("a")),
        (Value::Nil, Value::from("ghost")),
        (Value::Int(2), Value::Nil),
        (Value::Int(2), Value::from("b")),
    ]);

    let encoded = encode(&Value::Table(table)).unwrap();
    assert_eq!(&encoded.as_slice()[4..7], &[0x05, 0x02, 0x00]);

    let decoded = decode_slice(encoded.as_slice()).unwrap();
    let decoded = decoded.as_table().unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get(&Value::Int(2)), Some(Value::from("b")));
}

#[test]
fn test_count_width_8bit_to_16bit() {
    let entries = (1..=255).map(|i| (Value::Int(i), Value::Bool(true)));
    let encoded = encode(&Value::Table(Table::from_entries(entries.collect()))).unwrap();
    assert_eq!(&encoded.as_slice()[4..7], &[0x05, 0xFF, 0x00]);

    let entries = (1..=256).map(|i| (Value::Int(i), Value::Bool(true)));
    let encoded = encode(&Value::Table(Table::from_entries(entries.collect()))).unwrap();
    // narr 256 no longer fits one byte per count.
    assert_eq!(&encoded.as_slice()[4..9], &[0x15, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn test_count_width_16bit_to_32bit() {
    let entries = (1..=65535).map(|i| (Value::Int(i), Value::Bool(true)));
    let encoded = encode(&Value::Table(Table::from_entries(entries.collect()))).unwrap();
    assert_eq!(&encoded.as_slice()[4..9], &[0x15, 0xFF, 0xFF, 0x00, 0x00]);

    let entries = (1..=65536).map(|i| (Value::Int(i), Value::Bool(true)));
    let encoded = encode(&Value::Table(Table::from_entries(entries.collect()))).unwrap();
    assert_eq!(
        &encoded.as_slice()[4..13],
        &[0x25, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );

    let decoded = decode_slice(encoded.as_slice()).unwrap();
    assert_eq!(decoded.as_table().unwrap().len(), 65536);
}

#[test]
fn test_round_trip_nested_tables() {
    let inner = Table::new();
    inner.set(Value::from("name"), Value::from("deep"));
    let table = Table::new();
    table.push(Value::Int(10));
    table.push(Value::from("two"));
    table.set(Value::from("flag"), Value::Bool(true));
    table.set(Value::from("child"), Value::Table(inner));

    let decoded = round_trip(&Value::Table(table.clone()));
    assert_eq!(decoded, Value::Table(table));
}

// ==================== Back-references ====================

#[test]
fn test_shared_table_encoded_once() {
    let inner = Table::new();
    inner.set(Value::from("n"), Value::Int(1));
    let outer = Table::new();
    outer.push(Value::Table(inner.clone()));
    outer.push(Value::Table(inner));

    // The second occurrence is a back-reference to table ordinal 2
    // (the outer table itself is ordinal 1).
    let mut expected = wire(&[0x05, 0x02, 0x00]);
    expected.push(0x43);
    expected.extend_from_slice(&1i64.to_be_bytes());
    expected.extend_from_slice(&[0x05, 0x00, 0x01, 0x44, 0x01, b'n']);
    expected.push(0x43);
    expected.extend_from_slice(&1i64.to_be_bytes());
    expected.push(0x43);
    expected.extend_from_slice(&2i64.to_be_bytes());
    expected.push(0x45);
    expected.extend_from_slice(&2i64.to_be_bytes());

    let encoded = encode(&Value::Table(outer)).unwrap();
    assert_eq!(encoded.as_slice(), expected);
}

#[test]
fn test_shared_table_identity_survives() {
    let inner = Table::new();
    inner.set(Value::from("n"), Value::Int(1));
    let outer = Table::new();
    outer.push(Value::Table(inner.clone()));
    outer.push(Value::Table(inner));

    let decoded = round_trip(&Value::Table(outer));
    let decoded = decoded.as_table().unwrap();
    let first = decoded.get(&Value::Int(1)).unwrap();
    let second = decoded.get(&Value::Int(2)).unwrap();
    let first = first.as_table().unwrap();
    let second = second.as_table().unwrap();
    assert!(first.ptr_eq(second));

    // A write through one handle is visible through the other.
    first.set(Value::from("n"), Value::Int(2));
    assert_eq!(second.get(&Value::from("n")), Some(Value::Int(2)));
}

#[test]
fn test_self_referential_table() {
    let table = Table::new();
    table.set(Value::Int(1), Value::Table(table.clone()));

    let mut expected = wire(&[0x05, 0x01, 0x00]);
    expected.push(0x43);
    expected.extend_from_slice(&1i64.to_be_bytes());
    expected.push(0x45);
    expected.extend_from_slice(&1i64.to_be_bytes());

    let encoded = encode(&Value::Table(table)).unwrap();
    assert_eq!(encoded.as_slice(), expected);

    let decoded = decode_slice(encoded.as_slice()).unwrap();
    let decoded = decoded.as_table().unwrap();
    let member = decoded.get(&Value::Int(1)).unwrap();
    assert!(member.as_table().unwrap().ptr_eq(decoded));
}

#[test]
fn test_mutual_cycle() {
    let a = Table::new();
    let b = Table::new();
    a.set(Value::from("peer"), Value::Table(b.clone()));
    b.set(Value::from("peer"), Value::Table(a.clone()));

    let decoded = round_trip(&Value::Table(a));
    let decoded_a = decoded.as_table().unwrap();
    let decoded_b = decoded_a.get(&Value::from("peer")).unwrap();
    let decoded_b = decoded_b.as_table().unwrap();
    let back = decoded_b.get(&Value::from("peer")).unwrap();
    assert!(back.as_table().unwrap().ptr_eq(decoded_a));
}

// ==================== Nesting depth ====================

fn nested_chain(depth: usize) -> Value {
    let mut value = Value::Bool(true);
    for _ in 0..depth {
        let table = Table::new();
        table.set(Value::Int(1), value);
        value = Value::Table(table);
    }
    value
}

#[test]
fn test_round_trip_deep_chain() {
    let decoded = round_trip(&nested_chain(100));
    let mut cursor = decoded;
    for _ in 0..100 {
        let table = cursor.as_table().unwrap().clone();
        cursor = table.get(&Value::Int(1)).unwrap();
    }
    assert_eq!(cursor, Value::Bool(true));
}

#[test]
fn test_encode_depth_cap() {
    let err = encode(&nested_chain(1025)).unwrap_err();
    assert!(matches!(err, CacheError::Encode(_)));
    assert!(err.to_string().contains("too deep"));
}

#[test]
fn test_decode_depth_cap() {
    // 1024 nested single-element tables followed by one more table tag.
    let mut payload = Vec::new();
    for _ in 0..1024 {
        payload.extend_from_slice(&[0x05, 0x01, 0x00, 0x43]);
        payload.extend_from_slice(&1i64.to_be_bytes());
    }
    payload.push(0x05);
    let err = decode_slice(&wire(&payload)).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("too deep"));
}

// ==================== Decode validation ====================

#[test]
fn test_decode_rejects_bad_version() {
    let err = decode_slice(&[0x4C, 0x4D, 0xF6, 0x03, 0x41]).unwrap_err();
    assert!(matches!(err, CacheError::Version));

    assert!(matches!(decode_slice(&[]), Err(CacheError::Version)));
    assert!(matches!(
        decode_slice(&[0x4C, 0x4D, 0xF6]),
        Err(CacheError::Version)
    ));
}

#[test]
fn test_decode_rejects_trailing_data() {
    let mut bytes = encode(&Value::Bool(true)).unwrap().into_vec();
    bytes.push(0x00);
    let err = decode_slice(&bytes).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("extra data"));
}

#[test]
fn test_decode_rejects_unknown_tag() {
    let err = decode_slice(&wire(&[0x07])).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("unknown type tag"));
}

#[test]
fn test_decode_rejects_bad_backref() {
    // No table has been decoded yet, so any ordinal is out of range.
    let mut payload = vec![0x45];
    payload.extend_from_slice(&1i64.to_be_bytes());
    let err = decode_slice(&wire(&payload)).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("back-reference"));

    // Ordinal zero is never valid.
    let mut payload = vec![0x05, 0x01, 0x00, 0x43];
    payload.extend_from_slice(&1i64.to_be_bytes());
    payload.push(0x45);
    payload.extend_from_slice(&0i64.to_be_bytes());
    let err = decode_slice(&wire(&payload)).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
}

#[test]
fn test_decode_rejects_negative_counts() {
    let mut payload = vec![0x35];
    payload.extend_from_slice(&(-1i64).to_be_bytes());
    payload.extend_from_slice(&0i64.to_be_bytes());
    let err = decode_slice(&wire(&payload)).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("table size"));
}

#[test]
fn test_decode_rejects_negative_string_size() {
    let err = decode_slice(&wire(&[0x04, 0x80, 0, 0, 0, 0, 0, 0, 0])).unwrap_err();
    assert!(matches!(err, CacheError::Corrupt(_)));
    assert!(err.to_string().contains("string size"));
}

#[test]
fn test_decode_truncated_input() {
    // Integer missing most of its payload.
    assert!(matches!(
        decode_slice(&wire(&[0x43, 0x01])),
        Err(CacheError::Underflow)
    ));
    // Short string shorter than its declared length.
    assert!(matches!(
        decode_slice(&wire(&[0x44, 0x05, b'a'])),
        Err(CacheError::Underflow)
    ));
    // Table counts cut off.
    assert!(matches!(
        decode_slice(&wire(&[0x15, 0x00])),
        Err(CacheError::Underflow)
    ));
}

#[test]
fn test_decode_from_buffer() {
    let mut buf = Buffer::from(encode(&Value::Int(7)).unwrap().as_slice());
    assert_eq!(decode(&mut buf).unwrap(), Value::Int(7));
    assert_eq!(buf.remaining(), 0);
}

// ==================== Value and table API ====================

#[test]
fn test_value_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(42i64), Value::Int(42));
    assert_eq!(Value::from(2.5f64), Value::Float(2.5));
    assert_eq!(Value::from("abc").as_str(), Some(&b"abc"[..]));
    assert_eq!(Value::from(String::from("abc")), Value::from("abc"));
    assert_eq!(Value::from(b"abc".to_vec()), Value::from("abc"));
}

#[test]
fn test_value_accessors() {
    assert!(Value::Nil.is_nil());
    assert_eq!(Value::Bool(true).as_bool(), Some(true));
    assert_eq!(Value::Int(5).as_int(), Some(5));
    assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
    assert_eq!(Value::Int(5).as_float(), None);
    assert_eq!(Value::Int(5).as_str(), None);
    assert!(Value::Table(Table::new()).as_table().is_some());
}

#[test]
fn test_table_set_replaces() {
    let table = Table::new();
    table.set(Value::from("k"), Value::Int(1));
    table.set(Value::from("k"), Value::Int(2));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(&Value::from("k")), Some(Value::Int(2)));
}

#[test]
fn test_table_set_nil_removes() {
    let table = Table::new();
    table.set(Value::from("k"), Value::Int(1));
    table.set(Value::from("k"), Value::Nil);
    assert!(table.is_empty());
    assert_eq!(table.get(&Value::from("k")), None);

    // A nil key is ignored outright.
    table.set(Value::Nil, Value::Int(1));
    assert!(table.is_empty());
}

#[test]
fn test_table_push_appends_densely() {
    let table = Table::new();
    table.push(Value::from("a"));
    table.push(Value::from("b"));
    table.set(Value::Int(3), Value::from("c"));
    table.push(Value::from("d"));
    assert_eq!(table.get(&Value::Int(4)), Some(Value::from("d")));
}

#[test]
fn test_table_duplicate_entries_read_newest() {
    let table = Table::from_entries(vec![
        (Value::from("k"), Value::Int(1)),
        (Value::from("k"), Value::Int(2)),
    ]);
    assert_eq!(table.get(&Value::from("k")), Some(Value::Int(2)));
}

#[test]
fn test_table_entries_snapshot() {
    let table = Table::new();
    table.push(Value::Int(10));
    table.set(Value::from("k"), Value::from("v"));
    // Overwriting keeps the entry in place.
    table.set(Value::Int(1), Value::Int(20));

    assert_eq!(
        table.entries(),
        vec![
            (Value::Int(1), Value::Int(20)),
            (Value::from("k"), Value::from("v")),
        ]
    );

    // Entry order survives a round trip.
    let decoded = round_trip(&Value::Table(table.clone()));
    assert_eq!(decoded.as_table().unwrap().entries(), table.entries());
}

#[test]
fn test_table_keys_compared_by_identity() {
    let key_a = Table::new();
    let key_b = Table::new();
    let table = Table::new();
    table.set(Value::Table(key_a.clone()), Value::Int(1));
    table.set(Value::Table(key_b), Value::Int(2));

    // Structurally equal keys are still distinct entries.
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(&Value::Table(key_a)), Some(Value::Int(1)));
}

#[test]
fn test_table_equality() {
    let a = Table::new();
    a.set(Value::from("k"), Value::Int(1));
    let b = Table::new();
    b.set(Value::from("k"), Value::Int(1));

    assert_eq!(a, b);
    assert!(!a.ptr_eq(&b));
    assert!(a.ptr_eq(&a.clone()));

    b.set(Value::from("k"), Value::Int(2));
    assert_ne!(a, b);
}

#[test]
fn test_table_debug_handles_cycles() {
    let table = Table::new();
    table.set(Value::Int(1), Value::Table(table.clone()));
    let rendered = format!("{:?}", table);
    assert!(rendered.starts_with("table: 0x"));
    assert!(rendered.contains("1 entries"));
}
