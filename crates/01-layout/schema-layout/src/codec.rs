//! Typed read/write primitives over a schema-laid-out byte buffer.
//!
//! `write_fields` validates every value it was given against the layout
//! before touching the buffer, so a `SchemaError` never leaves a partial
//! write behind.

use crate::error::{SchemaError, SchemaResult};
use crate::layout::{FieldLayout, Layout};
use crate::schema::Numeric;
use crate::value::{Value, ValueMap};

/// Produces a full typed view of every field the layout declares.
pub fn read_snapshot(layout: &Layout, buffer: &[u8], base: usize) -> SchemaResult<ValueMap> {
    let mut out = ValueMap::new();
    for (name, field) in layout.fields() {
        let value = read_field(buffer, base + field.offset(), field)?;
        out = out.insert(name.clone(), value);
    }
    Ok(out)
}

/// Writes only the keys present in `values`, leaving every other byte in
/// `buffer` untouched. Fails without mutating `buffer` if any supplied value
/// does not match its field's declared kind.
pub fn write_fields(
    layout: &Layout,
    buffer: &mut [u8],
    base: usize,
    values: &ValueMap,
) -> SchemaResult<()> {
    validate_fields(layout, values)?;
    apply_fields(layout, buffer, base, values);
    Ok(())
}

fn validate_fields(layout: &Layout, values: &ValueMap) -> SchemaResult<()> {
    for (name, field) in layout.fields() {
        if let Some(value) = values.get(name) {
            validate_field(name, field, value)?;
        }
    }
    Ok(())
}

fn validate_field(name: &str, field: &FieldLayout, value: &Value) -> SchemaResult<()> {
    match field {
        FieldLayout::Scalar { numeric, .. } => {
            if !scalar_matches(*numeric, value) {
                return Err(SchemaError::TypeMismatch {
                    field: name.to_string(),
                });
            }
        }
        FieldLayout::Array { elem, count, .. } => {
            let actual = array_len(*elem, value).ok_or_else(|| SchemaError::TypeMismatch {
                field: name.to_string(),
            })?;
            if actual != *count {
                return Err(SchemaError::ArrayLengthMismatch {
                    field: name.to_string(),
                    expected: *count,
                    actual,
                });
            }
        }
        FieldLayout::Utf8 { byte_capacity, .. } => {
            let Value::Utf8(s) = value else {
                return Err(SchemaError::TypeMismatch {
                    field: name.to_string(),
                });
            };
            let actual = s.len();
            if actual > *byte_capacity {
                return Err(SchemaError::Utf8TooLong {
                    field: name.to_string(),
                    actual,
                    capacity: *byte_capacity,
                });
            }
        }
        FieldLayout::Rgba8 { pixel_count, .. } => {
            let Value::Rgba8(bytes) = value else {
                return Err(SchemaError::TypeMismatch {
                    field: name.to_string(),
                });
            };
            let expected = 4 * pixel_count;
            if bytes.len() != expected {
                return Err(SchemaError::ArrayLengthMismatch {
                    field: name.to_string(),
                    expected,
                    actual: bytes.len(),
                });
            }
        }
        FieldLayout::Nested { layout, .. } => {
            let Value::Nested(nested_values) = value else {
                return Err(SchemaError::ExpectedNestedObject {
                    field: name.to_string(),
                });
            };
            validate_fields(layout, nested_values)?;
        }
    }
    Ok(())
}

fn apply_fields(layout: &Layout, buffer: &mut [u8], base: usize, values: &ValueMap) {
    for (name, field) in layout.fields() {
        if let Some(value) = values.get(name) {
            apply_field(buffer, base + field.offset(), field, value);
        }
    }
}

fn apply_field(buffer: &mut [u8], offset: usize, field: &FieldLayout, value: &Value) {
    match field {
        FieldLayout::Scalar { numeric, .. } => write_scalar(buffer, offset, *numeric, value),
        FieldLayout::Array { elem, count, .. } => {
            write_array(buffer, offset, *elem, *count, value)
        }
        FieldLayout::Utf8 { byte_capacity, .. } => {
            let Value::Utf8(s) = value else { unreachable!("validated") };
            let dst = &mut buffer[offset..offset + byte_capacity];
            dst.fill(0);
            dst[..s.len()].copy_from_slice(s.as_bytes());
        }
        FieldLayout::Rgba8 { pixel_count, .. } => {
            let Value::Rgba8(bytes) = value else { unreachable!("validated") };
            let len = 4 * pixel_count;
            buffer[offset..offset + len].copy_from_slice(bytes);
        }
        FieldLayout::Nested { layout, .. } => {
            let Value::Nested(nested_values) = value else { unreachable!("validated") };
            apply_fields(layout, buffer, offset, nested_values);
        }
    }
}

fn scalar_matches(numeric: Numeric, value: &Value) -> bool {
    matches!(
        (numeric, value),
        (Numeric::I8, Value::I8(_))
            | (Numeric::U8, Value::U8(_))
            | (Numeric::I16, Value::I16(_))
            | (Numeric::U16, Value::U16(_))
            | (Numeric::I32, Value::I32(_))
            | (Numeric::U32, Value::U32(_))
            | (Numeric::F32, Value::F32(_))
            | (Numeric::F64, Value::F64(_))
    )
}

fn array_len(elem: Numeric, value: &Value) -> Option<usize> {
    match (elem, value) {
        (Numeric::I8, Value::I8Array(v)) => Some(v.len()),
        (Numeric::U8, Value::U8Array(v)) => Some(v.len()),
        (Numeric::I16, Value::I16Array(v)) => Some(v.len()),
        (Numeric::U16, Value::U16Array(v)) => Some(v.len()),
        (Numeric::I32, Value::I32Array(v)) => Some(v.len()),
        (Numeric::U32, Value::U32Array(v)) => Some(v.len()),
        (Numeric::F32, Value::F32Array(v)) => Some(v.len()),
        (Numeric::F64, Value::F64Array(v)) => Some(v.len()),
        _ => None,
    }
}

fn write_scalar(buffer: &mut [u8], offset: usize, numeric: Numeric, value: &Value) {
    let size = numeric.size();
    let dst = &mut buffer[offset..offset + size];
    match value {
        Value::I8(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::U8(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::I16(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::U16(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::I32(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::U32(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::F32(v) => dst.copy_from_slice(&v.to_le_bytes()),
        Value::F64(v) => dst.copy_from_slice(&v.to_le_bytes()),
        _ => unreachable!("validated against numeric kind {}", numeric.name()),
    }
}

fn write_array(buffer: &mut [u8], offset: usize, elem: Numeric, count: usize, value: &Value) {
    let elem_size = elem.size();
    macro_rules! write_elems {
        ($items:expr) => {
            for (i, item) in $items.iter().enumerate() {
                let start = offset + i * elem_size;
                buffer[start..start + elem_size].copy_from_slice(&item.to_le_bytes());
            }
        };
    }
    match value {
        Value::I8Array(v) => write_elems!(v),
        Value::U8Array(v) => write_elems!(v),
        Value::I16Array(v) => write_elems!(v),
        Value::U16Array(v) => write_elems!(v),
        Value::I32Array(v) => write_elems!(v),
        Value::U32Array(v) => write_elems!(v),
        Value::F32Array(v) => write_elems!(v),
        Value::F64Array(v) => write_elems!(v),
        _ => unreachable!("validated against array kind count {count}"),
    }
}

fn read_field(buffer: &[u8], offset: usize, field: &FieldLayout) -> SchemaResult<Value> {
    let value = match field {
        FieldLayout::Scalar { numeric, .. } => read_scalar(buffer, offset, *numeric),
        FieldLayout::Array { elem, count, .. } => read_array(buffer, offset, *elem, *count),
        FieldLayout::Utf8 { byte_capacity, .. } => {
            let raw = &buffer[offset..offset + byte_capacity];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let s = String::from_utf8_lossy(&raw[..end]).into_owned();
            Value::Utf8(s)
        }
        FieldLayout::Rgba8 { pixel_count, .. } => {
            let len = 4 * pixel_count;
            Value::Rgba8(buffer[offset..offset + len].to_vec())
        }
        FieldLayout::Nested { layout, .. } => {
            Value::Nested(read_snapshot(layout, buffer, offset)?)
        }
    };
    Ok(value)
}

fn read_scalar(buffer: &[u8], offset: usize, numeric: Numeric) -> Value {
    macro_rules! le {
        ($ty:ty) => {{
            let size = std::mem::size_of::<$ty>();
            let mut bytes = [0u8; std::mem::size_of::<$ty>()];
            bytes.copy_from_slice(&buffer[offset..offset + size]);
            <$ty>::from_le_bytes(bytes)
        }};
    }
    match numeric {
        Numeric::I8 => Value::I8(le!(i8)),
        Numeric::U8 => Value::U8(le!(u8)),
        Numeric::I16 => Value::I16(le!(i16)),
        Numeric::U16 => Value::U16(le!(u16)),
        Numeric::I32 => Value::I32(le!(i32)),
        Numeric::U32 => Value::U32(le!(u32)),
        Numeric::F32 => Value::F32(le!(f32)),
        Numeric::F64 => Value::F64(le!(f64)),
    }
}

fn read_array(buffer: &[u8], offset: usize, elem: Numeric, count: usize) -> Value {
    let elem_size = elem.size();
    macro_rules! collect {
        ($ty:ty, $variant:ident) => {{
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let start = offset + i * elem_size;
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(&buffer[start..start + elem_size]);
                out.push(<$ty>::from_le_bytes(bytes));
            }
            Value::$variant(out)
        }};
    }
    match elem {
        Numeric::I8 => collect!(i8, I8Array),
        Numeric::U8 => collect!(u8, U8Array),
        Numeric::I16 => collect!(i16, I16Array),
        Numeric::U16 => collect!(u16, U16Array),
        Numeric::I32 => collect!(i32, I32Array),
        Numeric::U32 => collect!(u32, U32Array),
        Numeric::F32 => collect!(f32, F32Array),
        Numeric::F64 => collect!(f64, F64Array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compile;
    use crate::schema::{FieldKind, Schema};

    fn rgba_schema() -> Schema {
        Schema::new()
            .field("width", FieldKind::Scalar(Numeric::U32))
            .field("height", FieldKind::Scalar(Numeric::U32))
            .field("feed", FieldKind::Rgba8 { pixel_count: 6 })
    }

    #[test]
    fn scenario_s4_rgba8_round_trip_and_mismatch() {
        let layout = compile(&rgba_schema()).unwrap();
        let mut buf = vec![0u8; layout.byte_length()];
        let values = ValueMap::new()
            .insert("width", Value::U32(4))
            .insert("height", Value::U32(2))
            .insert("feed", Value::Rgba8(vec![0u8; 24]));
        write_fields(&layout, &mut buf, 0, &values).unwrap();
        let snapshot = read_snapshot(&layout, &buf, 0).unwrap();
        assert_eq!(snapshot.get("feed"), Some(&Value::Rgba8(vec![0u8; 24])));

        let bad = ValueMap::new().insert("feed", Value::Rgba8(vec![0u8; 4]));
        let err = write_fields(&layout, &mut buf, 0, &bad).unwrap_err();
        assert!(matches!(err, SchemaError::ArrayLengthMismatch { .. }));
    }

    #[test]
    fn scenario_s5_partial_write_preserves_other_fields() {
        let schema = Schema::new().field(
            "nested",
            FieldKind::Nested(
                Schema::new()
                    .field("count", FieldKind::Scalar(Numeric::U16))
                    .field("energy", FieldKind::Scalar(Numeric::F64)),
            ),
        );
        let layout = compile(&schema).unwrap();
        let mut buf = vec![0u8; layout.byte_length()];

        let full = ValueMap::new().insert(
            "nested",
            Value::Nested(
                ValueMap::new()
                    .insert("count", Value::U16(1))
                    .insert("energy", Value::F64(2.5)),
            ),
        );
        write_fields(&layout, &mut buf, 0, &full).unwrap();

        let partial = ValueMap::new().insert(
            "nested",
            Value::Nested(ValueMap::new().insert("count", Value::U16(11))),
        );
        write_fields(&layout, &mut buf, 0, &partial).unwrap();

        let snapshot = read_snapshot(&layout, &buf, 0).unwrap();
        let Some(Value::Nested(nested)) = snapshot.get("nested") else {
            panic!("expected nested value");
        };
        assert_eq!(nested.get("count"), Some(&Value::U16(11)));
        assert_eq!(nested.get("energy"), Some(&Value::F64(2.5)));
    }

    #[test]
    fn invariant_6_utf8_byte_budget() {
        let schema = Schema::new().field("label", FieldKind::Utf8 { byte_capacity: 3 });
        let layout = compile(&schema).unwrap();
        let mut buf = vec![0xffu8; layout.byte_length()];

        // exactly at capacity round-trips
        let ok = ValueMap::new().insert("label", Value::Utf8("abc".to_string()));
        write_fields(&layout, &mut buf, 0, &ok).unwrap();
        let snapshot = read_snapshot(&layout, &buf, 0).unwrap();
        assert_eq!(snapshot.get("label"), Some(&Value::Utf8("abc".to_string())));

        // multi-byte encoding under capacity round-trips
        let multibyte = ValueMap::new().insert("label", Value::Utf8("ä".to_string()));
        write_fields(&layout, &mut buf, 0, &multibyte).unwrap();
        let snapshot = read_snapshot(&layout, &buf, 0).unwrap();
        assert_eq!(snapshot.get("label"), Some(&Value::Utf8("ä".to_string())));

        // one byte over capacity fails and leaves the buffer untouched
        let before = buf.clone();
        let too_long = ValueMap::new().insert("label", Value::Utf8("abcd".to_string()));
        let err = write_fields(&layout, &mut buf, 0, &too_long).unwrap_err();
        assert!(matches!(err, SchemaError::Utf8TooLong { .. }));
        assert_eq!(buf, before);
    }
}
