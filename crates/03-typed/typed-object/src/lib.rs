//! A schema-typed view over a [`shared_object::SharedObject`]: compiles a
//! schema once into a [`schema_layout::Layout`], then reads and writes
//! [`ValueMap`]s over the object's raw byte slots instead of raw bytes.

use std::sync::Arc;

use schema_layout::{compile, read_snapshot, write_fields, Layout, Schema, SchemaError, ValueMap};
use shared_object::{
    Descriptor, ReadView, RequestWriteError, SharedObject, Subscription, WaitOptions,
};

mod error;
pub use error::TypedCreateError;

/// The full typed record and the sequence number it was read under.
#[derive(Debug, Clone)]
pub struct TypedReadView {
    pub values: ValueMap,
    pub seq: i32,
}

/// Handed to a `request_write` callback: a pre-callback snapshot of the
/// fields already in the slot being written (`view`, copied forward so a
/// writer can make a decision based on the record's current state), the raw
/// bytes of that slot, and `set` as sugar for validating and writing a
/// partial update without hand-computing offsets.
pub struct WriteContext<'a> {
    pub view: ValueMap,
    bytes: &'a mut [u8],
    layout: &'a Layout,
}

impl<'a> WriteContext<'a> {
    pub fn set(&mut self, partial: &ValueMap) -> Result<(), SchemaError> {
        write_fields(self.layout, &mut *self.bytes, 0, partial)
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

/// A shared object whose slots are laid out according to a compiled schema.
#[derive(Clone)]
pub struct TypedObject {
    object: SharedObject,
    layout: Arc<Layout>,
}

impl TypedObject {
    pub fn create(id: impl Into<String>, schema: &Schema) -> Result<Self, TypedCreateError> {
        Self::create_with_options(id, schema, WaitOptions::default())
    }

    pub fn create_with_options(
        id: impl Into<String>,
        schema: &Schema,
        wait_options: WaitOptions,
    ) -> Result<Self, TypedCreateError> {
        let layout = compile(schema)?;
        let object = SharedObject::create_with_options(id, layout.byte_length(), wait_options)?;
        Ok(Self {
            object,
            layout: Arc::new(layout),
        })
    }

    pub fn from_descriptor(descriptor: &Descriptor, schema: &Schema) -> Result<Self, SchemaError> {
        Self::from_descriptor_with_options(descriptor, schema, WaitOptions::default())
    }

    pub fn from_descriptor_with_options(
        descriptor: &Descriptor,
        schema: &Schema,
        wait_options: WaitOptions,
    ) -> Result<Self, SchemaError> {
        let layout = compile(schema)?;
        let object = SharedObject::from_descriptor_with_options(descriptor, wait_options);
        Ok(Self {
            object,
            layout: Arc::new(layout),
        })
    }

    pub fn descriptor(&self) -> Descriptor {
        self.object.descriptor()
    }

    pub fn id(&self) -> &str {
        self.object.id()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Writes exactly the fields present in `values`, leaving every other
    /// field at whatever the previous publish left it.
    pub fn write(&self, values: &ValueMap) -> Result<(), RequestWriteError<SchemaError>> {
        let layout = Arc::clone(&self.layout);
        self.object
            .request_write(move |bytes| write_fields(&layout, bytes, 0, values))
    }

    /// Runs `cb` against the slot about to be published, giving it the
    /// slot's current field values (`view`) alongside raw byte access and
    /// `set` sugar for validated partial writes.
    pub fn request_write<T, E>(
        &self,
        cb: impl FnOnce(WriteContext<'_>) -> Result<T, E>,
    ) -> Result<T, RequestWriteError<E>> {
        let layout = Arc::clone(&self.layout);
        self.object.request_write(move |bytes| {
            let view = read_snapshot(&layout, bytes, 0).unwrap_or_default();
            let ctx = WriteContext {
                view,
                bytes,
                layout: &layout,
            };
            cb(ctx)
        })
    }

    /// Reads the most recently published record. `None` if nothing has
    /// been published yet, or if every sequence-lock retry raced a publish.
    pub fn read(&self) -> Option<TypedReadView> {
        let ReadView { bytes, seq } = self.object.read_latest()?;
        let values = read_snapshot(&self.layout, &bytes, 0).ok()?;
        Some(TypedReadView { values, seq })
    }

    pub fn subscribe(&self, cb: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.object.subscribe(cb)
    }

    pub fn mark_writer_thread_died(&self, thread_id: i32) {
        self.object.mark_writer_thread_died(thread_id);
    }

    pub fn is_poisoned(&self) -> bool {
        self.object.is_poisoned()
    }
}
