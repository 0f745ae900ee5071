//! Schema layout scenarios exercised through a live [`TypedObject`] rather
//! than against [`schema_layout::Layout`] directly.

use schema_layout::{FieldKind, Numeric, Schema, Value, ValueMap};
use typed_object::TypedObject;

fn telemetry_schema() -> Schema {
    Schema::new()
        .field("flag", FieldKind::Scalar(Numeric::U8))
        .field("label", FieldKind::Utf8 { byte_capacity: 10 })
        .field(
            "vector",
            FieldKind::Array {
                elem: Numeric::F32,
                count: 3,
            },
        )
        .field(
            "nested",
            FieldKind::Nested(
                Schema::new()
                    .field("count", FieldKind::Scalar(Numeric::U16))
                    .field("energy", FieldKind::Scalar(Numeric::F64)),
            ),
        )
}

#[test]
fn scenario_s3_schema_layout_round_trips_through_a_typed_object() {
    let object = TypedObject::create("telemetry", &telemetry_schema()).unwrap();
    assert_eq!(object.layout().byte_length(), 40);

    let values = ValueMap::new()
        .insert("flag", Value::U8(1))
        .insert("label", Value::Utf8("ok".to_string()))
        .insert("vector", Value::F32Array(vec![1.0, 2.0, 3.0]))
        .insert(
            "nested",
            Value::Nested(
                ValueMap::new()
                    .insert("count", Value::U16(7))
                    .insert("energy", Value::F64(1.5)),
            ),
        );
    object.write(&values).unwrap();

    let view = object.read().unwrap();
    assert_eq!(view.values.get("flag"), Some(&Value::U8(1)));
    assert_eq!(view.values.get("label"), Some(&Value::Utf8("ok".to_string())));
}

#[test]
fn scenario_s4_rgba8_field_round_trips_through_a_typed_object() {
    let schema = Schema::new()
        .field("width", FieldKind::Scalar(Numeric::U32))
        .field("height", FieldKind::Scalar(Numeric::U32))
        .field("feed", FieldKind::Rgba8 { pixel_count: 6 });
    let object = TypedObject::create("camera-feed", &schema).unwrap();
    assert_eq!(object.layout().byte_length(), 32);

    let mut pixels = vec![0u8; 24];
    pixels[0] = 0xff;
    object
        .write(
            &ValueMap::new()
                .insert("width", Value::U32(4))
                .insert("height", Value::U32(2))
                .insert("feed", Value::Rgba8(pixels.clone())),
        )
        .unwrap();

    let view = object.read().unwrap();
    assert_eq!(view.values.get("feed"), Some(&Value::Rgba8(pixels)));
}

#[test]
fn scenario_s5_partial_write_through_request_write_preserves_other_fields() {
    let schema = Schema::new()
        .field("count", FieldKind::Scalar(Numeric::U16))
        .field("label", FieldKind::Utf8 { byte_capacity: 8 });
    let object = TypedObject::create("partial-write", &schema).unwrap();

    object
        .write(&ValueMap::new().insert("label", Value::Utf8("steady".to_string())))
        .unwrap();

    object
        .request_write::<_, schema_layout::SchemaError>(|mut ctx| {
            ctx.set(&ValueMap::new().insert("count", Value::U16(3)))
        })
        .unwrap();

    let view = object.read().unwrap();
    assert_eq!(view.values.get("count"), Some(&Value::U16(3)));
    assert_eq!(
        view.values.get("label"),
        Some(&Value::Utf8("steady".to_string()))
    );
}
