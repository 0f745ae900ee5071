//! Compiles declarative field schemas into fixed byte layouts and reads or
//! writes typed values over them.

mod codec;
mod error;
mod layout;
mod schema;
mod value;

pub use codec::{read_snapshot, write_fields};
pub use error::{SchemaError, SchemaResult};
pub use layout::{compile, FieldLayout, Layout};
pub use schema::{FieldKind, Numeric, Schema};
pub use value::{Value, ValueMap};
