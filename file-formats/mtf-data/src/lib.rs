//! Shared data layer for MT Framework asset formats.
//!
//! The [`schema`] module holds the declarative layout engine every format
//! crate builds on. [`half_float`] and [`types`] carry the numeric helpers
//! and geometry types those crates share.

pub mod error;
pub mod half_float;
pub mod record;
pub mod schema;
pub mod types;

pub use error::{DataError, Result};

pub mod prelude {
    pub use crate::error::{DataError, Result};
    pub use crate::record::{SchemaRecord, records_value};
    pub use crate::schema::{
        Count, FieldDef, FieldKind, FieldValues, Primitive, RecordView, Schema, Structure, Value,
    };
    pub use crate::types::{BoundingBox, BoundingSphere, Magic};
    pub use bytes::Bytes;
}
