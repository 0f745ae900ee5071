//! The host's bookkeeping of every shared object it has registered, kept
//! independent of whether a given object is raw or schema-typed.

use schema_layout::Schema;
use shared_object::{CreateError, Descriptor, SharedObject};
use typed_object::{TypedCreateError, TypedObject};

pub(crate) enum RegisteredObject {
    Raw(SharedObject),
    Typed(TypedObject),
}

impl RegisteredObject {
    pub(crate) fn descriptor(&self) -> Descriptor {
        match self {
            RegisteredObject::Raw(object) => object.descriptor(),
            RegisteredObject::Typed(object) => object.descriptor(),
        }
    }

    pub(crate) fn mark_writer_thread_died(&self, thread_id: i32) {
        match self {
            RegisteredObject::Raw(object) => object.mark_writer_thread_died(thread_id),
            RegisteredObject::Typed(object) => object.mark_writer_thread_died(thread_id),
        }
    }
}

pub(crate) fn create_raw(id: String, byte_length: usize) -> Result<(SharedObject, RegisteredObject), CreateError> {
    let object = SharedObject::create(id, byte_length)?;
    Ok((object.clone(), RegisteredObject::Raw(object)))
}

pub(crate) fn create_typed(
    id: String,
    schema: &Schema,
) -> Result<(TypedObject, RegisteredObject), TypedCreateError> {
    let object = TypedObject::create(id, schema)?;
    Ok((object.clone(), RegisteredObject::Typed(object)))
}
