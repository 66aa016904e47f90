use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use super::{Primitive, Schema};
use crate::error::{DataError, Result};
use crate::record::SchemaRecord;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Shape {
    Scalar(Primitive),
    Array(Primitive, usize),
    Records(&'static Schema, usize),
    Bytes,
    Padding,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub offset: usize,
    pub len: usize,
    pub shape: Shape,
}

/// Typed read access to the fields resolved so far.
///
/// Count and kind functions receive one while a record is still being
/// resolved. [`Structure::view`] gives one over a complete record.
#[derive(Clone, Copy)]
pub struct RecordView<'a> {
    schema: &'static Schema,
    data: &'a [u8],
    slots: &'a [Slot],
}

impl<'a> RecordView<'a> {
    pub(crate) fn new(schema: &'static Schema, data: &'a [u8], slots: &'a [Slot]) -> Self {
        Self {
            schema,
            data,
            slots,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn slot(&self, name: &str) -> Result<(&'static str, Slot)> {
        let index = self
            .schema
            .field_index(name)
            .ok_or_else(|| DataError::UnknownField {
                schema: self.schema.name,
                field: name.to_owned(),
            })?;
        let field = self.schema.fields[index].name;
        let slot = self
            .slots
            .get(index)
            .copied()
            .ok_or_else(|| mismatch(self.schema, field, "field is not resolved yet"))?;
        Ok((field, slot))
    }

    fn raw(&self, slot: Slot) -> &'a [u8] {
        &self.data[slot.offset..slot.offset + slot.len]
    }

    fn scalar(&self, name: &str) -> Result<(&'static str, Primitive, &'a [u8])> {
        let (field, slot) = self.slot(name)?;
        match slot.shape {
            Shape::Scalar(primitive) => Ok((field, primitive, self.raw(slot))),
            _ => Err(mismatch(self.schema, field, "not a scalar field")),
        }
    }

    /// Integer scalar widened to `i64`. 64-bit unsigned values keep their bit pattern.
    pub fn int(&self, name: &str) -> Result<i64> {
        let (field, primitive, raw) = self.scalar(name)?;
        if primitive.is_float() {
            return Err(mismatch(self.schema, field, "float field read as integer"));
        }
        Ok(read_int(primitive, raw))
    }

    /// Any scalar widened to `f64`.
    pub fn float(&self, name: &str) -> Result<f64> {
        let (_, primitive, raw) = self.scalar(name)?;
        Ok(read_float(primitive, raw))
    }

    pub fn u8(&self, name: &str) -> Result<u8> {
        narrow(self.int(name)?, "u8")
    }

    pub fn i8(&self, name: &str) -> Result<i8> {
        narrow(self.int(name)?, "i8")
    }

    pub fn u16(&self, name: &str) -> Result<u16> {
        narrow(self.int(name)?, "u16")
    }

    pub fn i16(&self, name: &str) -> Result<i16> {
        narrow(self.int(name)?, "i16")
    }

    pub fn u32(&self, name: &str) -> Result<u32> {
        narrow(self.int(name)?, "u32")
    }

    pub fn i32(&self, name: &str) -> Result<i32> {
        narrow(self.int(name)?, "i32")
    }

    pub fn f32(&self, name: &str) -> Result<f32> {
        Ok(self.float(name)? as f32)
    }

    /// Raw bytes of any field.
    pub fn bytes(&self, name: &str) -> Result<&'a [u8]> {
        let (_, slot) = self.slot(name)?;
        Ok(self.raw(slot))
    }

    /// Byte field read as a NUL-terminated string.
    pub fn fixed_str(&self, name: &str) -> Result<String> {
        let raw = self.bytes(name)?;
        let end = memchr::memchr(0, raw).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    fn array(&self, name: &str) -> Result<(&'static str, Primitive, &'a [u8])> {
        let (field, slot) = self.slot(name)?;
        match slot.shape {
            Shape::Array(primitive, _) => Ok((field, primitive, self.raw(slot))),
            _ => Err(mismatch(self.schema, field, "not an array field")),
        }
    }

    pub fn ints(&self, name: &str) -> Result<Vec<i64>> {
        let (field, primitive, raw) = self.array(name)?;
        if primitive.is_float() {
            return Err(mismatch(self.schema, field, "float array read as integers"));
        }
        Ok(raw
            .chunks_exact(primitive.size())
            .map(|chunk| read_int(primitive, chunk))
            .collect())
    }

    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        let (_, primitive, raw) = self.array(name)?;
        Ok(raw
            .chunks_exact(primitive.size())
            .map(|chunk| read_float(primitive, chunk))
            .collect())
    }

    fn typed_array(&self, name: &str, expected: Primitive) -> Result<&'a [u8]> {
        let (field, primitive, raw) = self.array(name)?;
        if primitive != expected {
            return Err(mismatch(
                self.schema,
                field,
                format!("array of {} read as {}", primitive.name(), expected.name()),
            ));
        }
        Ok(raw)
    }

    pub fn u8s(&self, name: &str) -> Result<Vec<u8>> {
        let (_, slot) = self.slot(name)?;
        match slot.shape {
            Shape::Array(Primitive::U8, _) | Shape::Bytes => Ok(self.raw(slot).to_vec()),
            _ => self.typed_array(name, Primitive::U8).map(<[u8]>::to_vec),
        }
    }

    pub fn u16s(&self, name: &str) -> Result<Vec<u16>> {
        let raw = self.typed_array(name, Primitive::U16)?;
        Ok(raw.chunks_exact(2).map(LittleEndian::read_u16).collect())
    }

    pub fn i16s(&self, name: &str) -> Result<Vec<i16>> {
        let raw = self.typed_array(name, Primitive::I16)?;
        Ok(raw.chunks_exact(2).map(LittleEndian::read_i16).collect())
    }

    pub fn u32s(&self, name: &str) -> Result<Vec<u32>> {
        let raw = self.typed_array(name, Primitive::U32)?;
        Ok(raw.chunks_exact(4).map(LittleEndian::read_u32).collect())
    }

    pub fn u64s(&self, name: &str) -> Result<Vec<u64>> {
        let raw = self.typed_array(name, Primitive::U64)?;
        Ok(raw.chunks_exact(8).map(LittleEndian::read_u64).collect())
    }

    pub fn f32s(&self, name: &str) -> Result<Vec<f32>> {
        let raw = self.typed_array(name, Primitive::F32)?;
        Ok(raw.chunks_exact(4).map(LittleEndian::read_f32).collect())
    }

    /// Fixed-length `f32` array copied into an array of the same length.
    pub fn f32_array<const N: usize>(&self, name: &str) -> Result<[f32; N]> {
        let (field, _, _) = self.array(name)?;
        let values = self.f32s(name)?;
        let found = values.len();
        values
            .try_into()
            .map_err(|_| mismatch(self.schema, field, format!("expected {N} floats, found {found}")))
    }

    /// Absolute offset of a field in the underlying buffer.
    pub fn field_offset(&self, name: &str) -> Result<usize> {
        Ok(self.slot(name)?.1.offset)
    }

    pub fn field_len(&self, name: &str) -> Result<usize> {
        Ok(self.slot(name)?.1.len)
    }

    /// Element count of an array or records field, byte length otherwise.
    pub fn count(&self, name: &str) -> Result<usize> {
        let (_, slot) = self.slot(name)?;
        Ok(match slot.shape {
            Shape::Array(_, count) | Shape::Records(_, count) => count,
            Shape::Scalar(_) => 1,
            Shape::Bytes | Shape::Padding => slot.len,
        })
    }
}

/// A decoded or constructed record.
///
/// The underlying buffer is shared: sub-records and byte fields are
/// zero-copy slices of it.
#[derive(Clone)]
pub struct Structure {
    schema: &'static Schema,
    data: Bytes,
    start: usize,
    end: usize,
    slots: Vec<Slot>,
}

impl Structure {
    pub(crate) fn from_parts(
        schema: &'static Schema,
        data: Bytes,
        start: usize,
        end: usize,
        slots: Vec<Slot>,
    ) -> Self {
        Self {
            schema,
            data,
            start,
            end,
            slots,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn view(&self) -> RecordView<'_> {
        RecordView::new(self.schema, &self.data, &self.slots)
    }

    /// Bytes covered by this record.
    pub fn as_bytes(&self) -> Bytes {
        self.data.slice(self.start..self.end)
    }

    /// Offset of this record in the buffer it was parsed from.
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.view().int(name)
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        self.view().float(name)
    }

    pub fn u8(&self, name: &str) -> Result<u8> {
        self.view().u8(name)
    }

    pub fn i8(&self, name: &str) -> Result<i8> {
        self.view().i8(name)
    }

    pub fn u16(&self, name: &str) -> Result<u16> {
        self.view().u16(name)
    }

    pub fn i16(&self, name: &str) -> Result<i16> {
        self.view().i16(name)
    }

    pub fn u32(&self, name: &str) -> Result<u32> {
        self.view().u32(name)
    }

    pub fn i32(&self, name: &str) -> Result<i32> {
        self.view().i32(name)
    }

    pub fn f32(&self, name: &str) -> Result<f32> {
        self.view().f32(name)
    }

    pub fn fixed_str(&self, name: &str) -> Result<String> {
        self.view().fixed_str(name)
    }

    pub fn ints(&self, name: &str) -> Result<Vec<i64>> {
        self.view().ints(name)
    }

    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        self.view().floats(name)
    }

    pub fn u8s(&self, name: &str) -> Result<Vec<u8>> {
        self.view().u8s(name)
    }

    pub fn u16s(&self, name: &str) -> Result<Vec<u16>> {
        self.view().u16s(name)
    }

    pub fn i16s(&self, name: &str) -> Result<Vec<i16>> {
        self.view().i16s(name)
    }

    pub fn u32s(&self, name: &str) -> Result<Vec<u32>> {
        self.view().u32s(name)
    }

    pub fn u64s(&self, name: &str) -> Result<Vec<u64>> {
        self.view().u64s(name)
    }

    pub fn f32s(&self, name: &str) -> Result<Vec<f32>> {
        self.view().f32s(name)
    }

    pub fn f32_array<const N: usize>(&self, name: &str) -> Result<[f32; N]> {
        self.view().f32_array(name)
    }

    pub fn field_offset(&self, name: &str) -> Result<usize> {
        self.view().field_offset(name)
    }

    pub fn field_len(&self, name: &str) -> Result<usize> {
        self.view().field_len(name)
    }

    pub fn count(&self, name: &str) -> Result<usize> {
        self.view().count(name)
    }

    /// Zero-copy slice of any field.
    pub fn bytes(&self, name: &str) -> Result<Bytes> {
        let view = self.view();
        let offset = view.field_offset(name)?;
        let len = view.field_len(name)?;
        Ok(self.data.slice(offset..offset + len))
    }

    /// Lazily parsed elements of a records field.
    pub fn records(&self, name: &str) -> Result<Records> {
        let index = self
            .schema
            .field_index(name)
            .ok_or_else(|| DataError::UnknownField {
                schema: self.schema.name,
                field: name.to_owned(),
            })?;
        let slot = self.slots[index];
        match slot.shape {
            Shape::Records(schema, count) => Ok(Records {
                schema,
                data: self.data.clone(),
                offset: slot.offset,
                element_size: if count == 0 { 0 } else { slot.len / count },
                remaining: count,
            }),
            _ => Err(mismatch(
                self.schema,
                self.schema.fields[index].name,
                "not a records field",
            )),
        }
    }

    /// One element of a records field.
    pub fn record(&self, name: &str, index: usize) -> Result<Structure> {
        let records = self.records(name)?;
        records.get(index).ok_or_else(|| {
            DataError::malformed(
                format!("{}.{}", self.schema.name, name),
                format!("record index {index} out of range"),
            )
        })?
    }

    /// Every element of a records field converted to its typed form.
    pub fn records_as<T: SchemaRecord>(&self, name: &str) -> Result<Vec<T>> {
        self.records(name)?
            .map(|record| record.and_then(|record| T::from_structure(&record)))
            .collect()
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("schema", &self.schema.name)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("fields", &self.slots.len())
            .finish()
    }
}

/// Iterator over the elements of a records field.
#[derive(Debug, Clone)]
pub struct Records {
    schema: &'static Schema,
    data: Bytes,
    offset: usize,
    element_size: usize,
    remaining: usize,
}

impl Records {
    pub fn get(&self, index: usize) -> Option<Result<Structure>> {
        (index < self.remaining).then(|| {
            self.schema
                .parse_at(self.data.clone(), self.offset + index * self.element_size)
        })
    }
}

impl Iterator for Records {
    type Item = Result<Structure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.schema.parse_at(self.data.clone(), self.offset);
        self.offset += self.element_size;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Records {}

pub(crate) fn read_int(primitive: Primitive, raw: &[u8]) -> i64 {
    match primitive {
        Primitive::U8 => raw[0] as i64,
        Primitive::I8 => raw[0] as i8 as i64,
        Primitive::U16 => LittleEndian::read_u16(raw) as i64,
        Primitive::I16 => LittleEndian::read_i16(raw) as i64,
        Primitive::U32 => LittleEndian::read_u32(raw) as i64,
        Primitive::I32 => LittleEndian::read_i32(raw) as i64,
        Primitive::U64 => LittleEndian::read_u64(raw) as i64,
        Primitive::I64 => LittleEndian::read_i64(raw),
        Primitive::F32 => LittleEndian::read_f32(raw) as i64,
        Primitive::F64 => LittleEndian::read_f64(raw) as i64,
    }
}

pub(crate) fn read_float(primitive: Primitive, raw: &[u8]) -> f64 {
    match primitive {
        Primitive::F32 => LittleEndian::read_f32(raw) as f64,
        Primitive::F64 => LittleEndian::read_f64(raw),
        _ => read_int(primitive, raw) as f64,
    }
}

pub(crate) fn mismatch(
    schema: &'static Schema,
    field: &'static str,
    reason: impl Into<String>,
) -> DataError {
    DataError::SchemaMismatch {
        schema: schema.name,
        field,
        reason: reason.into(),
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, target: &'static str) -> Result<T> {
    T::try_from(value).map_err(|_| DataError::ValueOutOfRange {
        value: value.to_string(),
        target,
    })
}
