use bytes::Bytes;

use super::Structure;

/// A field value handed to [`Schema::construct`](super::Schema::construct).
///
/// Integers travel as `i64`. 64-bit unsigned fields accept the bit pattern
/// reinterpreted as `i64`.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Bytes(Bytes),
    Records(Vec<Structure>),
}

impl Value {
    /// Number of elements for array-like values, 1 for scalars.
    pub fn element_count(&self) -> usize {
        match self {
            Self::Int(_) | Self::Float(_) => 1,
            Self::Ints(items) => items.len(),
            Self::Floats(items) => items.len(),
            Self::Bytes(bytes) => bytes.len(),
            Self::Records(records) => records.len(),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Ints(_) => "integer array",
            Self::Floats(_) => "float array",
            Self::Bytes(_) => "bytes",
            Self::Records(_) => "records",
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(value as i64)
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Ints(values.into_iter().map(|v| v as i64).collect())
                }
            }

            impl From<&[$ty]> for Value {
                fn from(values: &[$ty]) -> Self {
                    Self::Ints(values.iter().map(|&v| v as i64).collect())
                }
            }

            impl<const N: usize> From<[$ty; N]> for Value {
                fn from(values: [$ty; N]) -> Self {
                    Self::Ints(values.iter().map(|&v| v as i64).collect())
                }
            }
        )*
    };
}

int_value!(i8, u16, i16, u32, i32, u64, i64);

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Int(value as i64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<f32>> for Value {
    fn from(values: Vec<f32>) -> Self {
        Self::Floats(values.into_iter().map(f64::from).collect())
    }
}

impl From<&[f32]> for Value {
    fn from(values: &[f32]) -> Self {
        Self::Floats(values.iter().map(|&v| f64::from(v)).collect())
    }
}

impl<const N: usize> From<[f32; N]> for Value {
    fn from(values: [f32; N]) -> Self {
        Self::Floats(values.iter().map(|&v| f64::from(v)).collect())
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(bytes: [u8; N]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(&bytes))
    }
}

impl From<Vec<Structure>> for Value {
    fn from(records: Vec<Structure>) -> Self {
        Self::Records(records)
    }
}

/// Named values for [`Schema::construct`](super::Schema::construct).
///
/// Fields without a value are zero-filled.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    entries: Vec<(&'static str, Value)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_existing() {
        let mut values = FieldValues::new();
        values.set("a", 1u32).set("b", 2.5f32).set("a", 7u32);
        assert_eq!(values.len(), 2);
        assert!(matches!(values.get("a"), Some(Value::Int(7))));
        assert!(matches!(values.get("b"), Some(Value::Float(v)) if *v == 2.5));
    }

    #[test]
    fn test_element_count() {
        assert_eq!(Value::from(vec![1u16, 2, 3]).element_count(), 3);
        assert_eq!(Value::from([0.0f32; 16]).element_count(), 16);
        assert_eq!(Value::from(&b"abcd"[..]).element_count(), 4);
        assert_eq!(Value::from(5u8).element_count(), 1);
    }
}
