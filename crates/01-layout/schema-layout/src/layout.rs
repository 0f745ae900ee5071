//! Compiles a [`Schema`] into a fixed byte [`Layout`] once, at registration time.

use std::collections::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{FieldKind, Numeric, Schema};

/// One field's position and shape within a compiled [`Layout`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLayout {
    Scalar { offset: usize, numeric: Numeric },
    Array {
        offset: usize,
        elem: Numeric,
        count: usize,
    },
    Utf8 { offset: usize, byte_capacity: usize },
    Rgba8 { offset: usize, pixel_count: usize },
    Nested { offset: usize, layout: Layout },
}

impl FieldLayout {
    pub fn offset(&self) -> usize {
        match self {
            FieldLayout::Scalar { offset, .. }
            | FieldLayout::Array { offset, .. }
            | FieldLayout::Utf8 { offset, .. }
            | FieldLayout::Rgba8 { offset, .. }
            | FieldLayout::Nested { offset, .. } => *offset,
        }
    }

    fn size(&self) -> usize {
        match self {
            FieldLayout::Scalar { numeric, .. } => numeric.size(),
            FieldLayout::Array { elem, count, .. } => elem.size() * count,
            FieldLayout::Utf8 { byte_capacity, .. } => *byte_capacity,
            FieldLayout::Rgba8 { pixel_count, .. } => 4 * pixel_count,
            FieldLayout::Nested { layout, .. } => layout.byte_length,
        }
    }

    fn alignment(&self) -> usize {
        match self {
            FieldLayout::Scalar { numeric, .. } => numeric.size(),
            FieldLayout::Array { elem, .. } => elem.size(),
            FieldLayout::Utf8 { .. } => 1,
            FieldLayout::Rgba8 { .. } => 1,
            FieldLayout::Nested { layout, .. } => layout.alignment,
        }
    }
}

/// A schema compiled to concrete byte offsets.
///
/// Fields keep declaration order; [`Layout::field`] gives O(1) name lookup via
/// an index built alongside the ordered field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    fields: Vec<(String, FieldLayout)>,
    index: HashMap<String, usize>,
    byte_length: usize,
    alignment: usize,
}

impl Layout {
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn fields(&self) -> &[(String, FieldLayout)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }
}

fn align_up(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return offset;
    }
    (offset + alignment - 1) & !(alignment - 1)
}

/// Compiles `schema` into a [`Layout`], validating the whole tree before any
/// offset is derived.
pub fn compile(schema: &Schema) -> SchemaResult<Layout> {
    let mut fields = Vec::with_capacity(schema.fields.len());
    let mut index = HashMap::with_capacity(schema.fields.len());
    let mut offset = 0usize;
    let mut max_alignment = 1usize;

    for (name, kind) in &schema.fields {
        let field_layout = compile_field(name, kind)?;
        let alignment = field_layout.alignment();
        max_alignment = max_alignment.max(alignment);
        offset = align_up(offset, alignment);
        let placed = place(field_layout, offset);
        offset += placed.size();
        index.insert(name.clone(), fields.len());
        fields.push((name.clone(), placed));
    }

    Ok(Layout {
        fields,
        index,
        byte_length: offset,
        alignment: max_alignment,
    })
}

/// Validates one field and compiles it with a placeholder offset of 0; the
/// caller fixes up the true offset via [`place`] once alignment is known.
fn compile_field(name: &str, kind: &FieldKind) -> SchemaResult<FieldLayout> {
    match kind {
        FieldKind::Scalar(numeric) => Ok(FieldLayout::Scalar {
            offset: 0,
            numeric: *numeric,
        }),
        FieldKind::Array { elem, count } => {
            if *count == 0 {
                return Err(SchemaError::InvalidLength {
                    field: name.to_string(),
                    length: *count as i64,
                });
            }
            Ok(FieldLayout::Array {
                offset: 0,
                elem: *elem,
                count: *count,
            })
        }
        FieldKind::Utf8 { byte_capacity } => Ok(FieldLayout::Utf8 {
            offset: 0,
            byte_capacity: *byte_capacity,
        }),
        FieldKind::Rgba8 { pixel_count } => {
            if *pixel_count == 0 {
                return Err(SchemaError::InvalidLength {
                    field: name.to_string(),
                    length: *pixel_count as i64,
                });
            }
            Ok(FieldLayout::Rgba8 {
                offset: 0,
                pixel_count: *pixel_count,
            })
        }
        FieldKind::Nested(nested) => {
            let nested_layout = compile(nested)?;
            Ok(FieldLayout::Nested {
                offset: 0,
                layout: nested_layout,
            })
        }
    }
}

fn place(field: FieldLayout, offset: usize) -> FieldLayout {
    match field {
        FieldLayout::Scalar { numeric, .. } => FieldLayout::Scalar { offset, numeric },
        FieldLayout::Array { elem, count, .. } => FieldLayout::Array {
            offset,
            elem,
            count,
        },
        FieldLayout::Utf8 { byte_capacity, .. } => FieldLayout::Utf8 {
            offset,
            byte_capacity,
        },
        FieldLayout::Rgba8 { pixel_count, .. } => FieldLayout::Rgba8 {
            offset,
            pixel_count,
        },
        FieldLayout::Nested { layout, .. } => FieldLayout::Nested { offset, layout },
    }
}
