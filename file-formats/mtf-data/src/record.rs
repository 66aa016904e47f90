use bytes::Bytes;

use crate::error::Result;
use crate::schema::{FieldValues, Schema, Structure, Value};

/// A typed record backed by a static [`Schema`].
pub trait SchemaRecord: Sized {
    fn schema() -> &'static Schema;

    fn from_structure(structure: &Structure) -> Result<Self>;

    fn to_values(&self) -> FieldValues;

    fn to_structure(&self) -> Result<Structure> {
        Self::schema().construct(self.to_values())
    }

    fn parse(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_structure(&Self::schema().parse(data)?)
    }
}

/// Serialize typed records into a [`Value::Records`] for a parent schema.
pub fn records_value<T: SchemaRecord>(items: &[T]) -> Result<Value> {
    items
        .iter()
        .map(SchemaRecord::to_structure)
        .collect::<Result<Vec<_>>>()
        .map(Value::Records)
}
