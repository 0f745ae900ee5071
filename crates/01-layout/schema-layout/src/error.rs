//! Error handling for the schema layout compiler.
//!
//! Validation happens up front: `compile` walks the whole schema tree before
//! deriving any offsets, and `write_fields` checks every supplied value
//! before storing a single byte, so a failure here never leaves a buffer
//! partially written.

/// Convenience result alias for fallible schema operations.
pub type SchemaResult<T, E = SchemaError> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
/// Errors surfaced by schema compilation and field read/write.
pub enum SchemaError {
    /// A fixed-length array or pixel-buffer field declared a non-positive length.
    #[error("field `{field}`: length must be at least 1, got {length}")]
    InvalidLength { field: String, length: i64 },

    /// A scalar field named a type outside `{i8,u8,i16,u16,i32,u32,f32,f64}`.
    #[error("field `{field}`: unknown scalar type")]
    UnknownScalarType { field: String },

    /// A nested field was given a non-object value.
    #[error("field `{field}`: expected a nested object value")]
    ExpectedNestedObject { field: String },

    /// A field was addressed that the schema does not declare.
    #[error("field `{field}`: not present in schema")]
    UnknownField { field: String },

    /// A value's runtime shape does not match the field's declared kind.
    #[error("field `{field}`: value does not match field kind")]
    TypeMismatch { field: String },

    /// A numeric-array or pixel-buffer value's length did not match the declared count.
    #[error("field `{field}`: expected {expected} elements, got {actual}")]
    ArrayLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A UTF-8 string's encoded byte length exceeded its field's capacity.
    #[error("field `{field}`: utf8 string of {actual} bytes exceeds capacity {capacity}")]
    Utf8TooLong {
        field: String,
        actual: usize,
        capacity: usize,
    },
}
