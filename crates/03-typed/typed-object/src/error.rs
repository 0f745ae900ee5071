//! Error handling for schema-typed object creation.

use schema_layout::SchemaError;
use shared_object::CreateError;

#[derive(Debug, thiserror::Error)]
pub enum TypedCreateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Create(#[from] CreateError),
}
