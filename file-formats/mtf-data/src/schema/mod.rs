//! Declarative binary layouts.
//!
//! A [`Schema`] is an ordered list of [`FieldDef`]s. A field's kind is either
//! fixed, counted from an earlier field, computed from the fields decoded so
//! far, or chosen at runtime through [`FieldKind::Dynamic`]. One interpreter
//! walks the list to parse a byte buffer ([`Schema::parse`]) or to lay out a
//! set of supplied values ([`Schema::construct`]).
//!
//! Fields resolve strictly in declaration order. Count and kind functions only
//! see fields declared before the one being resolved.
//!
//! ```
//! use mtf_data::schema::{Count, FieldDef, FieldValues, Primitive, Schema};
//!
//! static TABLE: Schema = Schema::new(
//!     "Table",
//!     &[
//!         FieldDef::scalar("count", Primitive::U16),
//!         FieldDef::array("values", Primitive::U32, Count::Field("count")),
//!     ],
//! );
//!
//! let parsed = TABLE.parse(vec![2u8, 0, 7, 0, 0, 0, 9, 0, 0, 0]).unwrap();
//! assert_eq!(parsed.u32s("values").unwrap(), vec![7, 9]);
//!
//! let built = TABLE
//!     .construct(FieldValues::new().with("count", 1u16).with("values", vec![5u32]))
//!     .unwrap();
//! assert_eq!(&built.as_bytes()[..], &[1, 0, 5, 0, 0, 0]);
//! ```

mod interp;
mod structure;
mod value;

pub use structure::{RecordView, Records, Structure};
pub use value::{FieldValues, Value};

use crate::error::{DataError, Result};

/// Little-endian scalar types a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl Primitive {
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Computes an element count from the fields resolved so far.
pub type CountFn = fn(&RecordView<'_>) -> Result<i64>;

/// Picks a field kind from the fields resolved so far.
pub type KindFn = fn(&RecordView<'_>) -> Result<FieldKind>;

/// Number of elements in an array-like field.
///
/// Negative results from [`Count::Field`] or [`Count::Computed`] are rejected
/// as malformed input, never clamped.
#[derive(Debug, Clone, Copy)]
pub enum Count {
    Fixed(usize),
    /// Value of an earlier integer field
    Field(&'static str),
    Computed(CountFn),
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(Primitive),
    Array(Primitive, Count),
    /// Contiguous fixed-size sub-records
    Records(&'static Schema, Count),
    Bytes(Count),
    /// Everything up to the end of the buffer
    Remaining,
    /// Zero padding up to the next multiple, relative to the record start
    Align(usize),
    Dynamic(KindFn),
}

/// Values the constructor writes back once the full layout is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    /// Offset of `target` from the start of the record. With `zero_if_empty`
    /// an empty target yields 0 instead.
    OffsetOf {
        target: &'static str,
        zero_if_empty: bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub derived: Option<Derived>,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            derived: None,
        }
    }

    pub const fn scalar(name: &'static str, primitive: Primitive) -> Self {
        Self::new(name, FieldKind::Scalar(primitive))
    }

    pub const fn array(name: &'static str, primitive: Primitive, count: Count) -> Self {
        Self::new(name, FieldKind::Array(primitive, count))
    }

    pub const fn records(name: &'static str, schema: &'static Schema, count: Count) -> Self {
        Self::new(name, FieldKind::Records(schema, count))
    }

    pub const fn bytes(name: &'static str, count: Count) -> Self {
        Self::new(name, FieldKind::Bytes(count))
    }

    /// Scalar field holding the offset of `target`, filled in by [`Schema::construct`].
    pub const fn offset_of(name: &'static str, primitive: Primitive, target: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar(primitive),
            derived: Some(Derived::OffsetOf {
                target,
                zero_if_empty: false,
            }),
        }
    }

    /// Like [`FieldDef::offset_of`], but 0 when `target` is empty.
    pub const fn offset_of_non_empty(
        name: &'static str,
        primitive: Primitive,
        target: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar(primitive),
            derived: Some(Derived::OffsetOf {
                target,
                zero_if_empty: true,
            }),
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [FieldDef]) -> Self {
        Self { name, fields }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Result<&FieldDef> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| DataError::UnknownField {
                schema: self.name,
                field: name.to_owned(),
            })
    }

    /// Size in bytes when every field has a fixed size, `None` otherwise.
    pub fn fixed_size(&self) -> Option<usize> {
        self.fields.iter().try_fold(0usize, |total, field| {
            let size = match field.kind {
                FieldKind::Scalar(primitive) => primitive.size(),
                FieldKind::Array(primitive, Count::Fixed(count)) => {
                    primitive.size().checked_mul(count)?
                }
                FieldKind::Records(schema, Count::Fixed(count)) => {
                    schema.fixed_size()?.checked_mul(count)?
                }
                FieldKind::Bytes(Count::Fixed(count)) => count,
                _ => return None,
            };
            total.checked_add(size)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static POINT: Schema = Schema::new(
        "Point",
        &[
            FieldDef::scalar("x", Primitive::F32),
            FieldDef::scalar("y", Primitive::F32),
            FieldDef::scalar("tag", Primitive::U8),
        ],
    );

    static CLOUD: Schema = Schema::new(
        "Cloud",
        &[
            FieldDef::scalar("count", Primitive::U32),
            FieldDef::records("points", &POINT, Count::Field("count")),
        ],
    );

    static FIXED_CLOUD: Schema = Schema::new(
        "FixedCloud",
        &[
            FieldDef::array("ids", Primitive::U16, Count::Fixed(3)),
            FieldDef::records("points", &POINT, Count::Fixed(2)),
            FieldDef::bytes("name", Count::Fixed(4)),
        ],
    );

    #[test]
    fn test_fixed_size() {
        assert_eq!(POINT.fixed_size(), Some(9));
        assert_eq!(FIXED_CLOUD.fixed_size(), Some(6 + 18 + 4));
        assert_eq!(CLOUD.fixed_size(), None);
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(CLOUD.field_index("points"), Some(1));
        assert!(CLOUD.field("nope").is_err());
    }

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(Primitive::U8.size(), 1);
        assert_eq!(Primitive::I16.size(), 2);
        assert_eq!(Primitive::F32.size(), 4);
        assert_eq!(Primitive::U64.size(), 8);
        assert!(Primitive::F64.is_float());
        assert!(!Primitive::I64.is_float());
    }
}
