use crate::engine::schema::{NullsOrder, OrderByKeyPart, SortDirection};
use crate::engine::types::ScalarValue;

// Per-field tag bytes. NULL sentinels sort strictly before (0x00) or
// after (0x02) every encoded non-null value (0x01), whatever the
// direction of the field.
const TAG_NULL_FIRST: u8 = 0x00;
const TAG_VALUE: u8 = 0x01;
const TAG_NULL_LAST: u8 = 0x02;

// Byte-string payloads: embedded 0x00 escapes to 0x00 0xFF, the field
// ends with 0x00 0x01. Prefix-free, so concatenated fields compare as
// tuples, and still prefix-free after the DESC complement.
const BYTES_ESCAPE: [u8; 2] = [0x00, 0xFF];
const BYTES_TERMINATOR: [u8; 2] = [0x00, 0x01];

/// Encode the ORDER BY key of one row so that ascending byte order of the
/// output equals the logical ORDER BY order.
pub fn encode_sort_key(parts: &[OrderByKeyPart], row: &[ScalarValue]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.len() * 9);
    for part in parts {
        let value = row.get(part.position).unwrap_or(&ScalarValue::Null);
        encode_field(&mut out, value, part.direction, part.nulls);
    }
    out
}

fn encode_field(
    out: &mut Vec<u8>,
    value: &ScalarValue,
    direction: SortDirection,
    nulls: NullsOrder,
) {
    if value.is_null() {
        out.push(match nulls {
            NullsOrder::First => TAG_NULL_FIRST,
            NullsOrder::Last => TAG_NULL_LAST,
        });
        return;
    }

    out.push(TAG_VALUE);
    let start = out.len();
    encode_ascending(out, value);
    if direction == SortDirection::Desc {
        // Complementing the ascending payload inverts its order without
        // touching the sentinel tags.
        for byte in &mut out[start..] {
            *byte = !*byte;
        }
    }
}

fn encode_ascending(out: &mut Vec<u8>, value: &ScalarValue) {
    match value {
        ScalarValue::Null => {}
        ScalarValue::Boolean(b) => out.push(u8::from(*b)),
        ScalarValue::Int64(v) | ScalarValue::Timestamp(v) => {
            out.extend_from_slice(&order_bytes_i64(*v));
        }
        ScalarValue::Float64(f) => out.extend_from_slice(&order_bytes_f64(*f)),
        ScalarValue::Utf8(s) => encode_escaped(out, s.as_bytes()),
        ScalarValue::Binary(b) => encode_escaped(out, b),
    }
}

/// Sign-flipped big-endian: byte order equals numeric order.
pub(crate) fn order_bytes_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

/// IEEE-754 total-order normalization: negative floats invert all bits,
/// non-negative floats flip the sign bit.
pub(crate) fn order_bytes_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let normalized = if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    };
    normalized.to_be_bytes()
}

fn encode_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == 0x00 {
            out.extend_from_slice(&BYTES_ESCAPE);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&BYTES_TERMINATOR);
}
