//! The interpreter behind [`Schema::parse`] and [`Schema::construct`].

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use log::{debug, error, trace};

use super::structure::{Shape, Slot, mismatch};
use super::{Count, Derived, FieldDef, FieldKind, FieldValues, Primitive, RecordView, Schema, Structure, Value};
use crate::error::{DataError, Result};

impl Schema {
    /// Parse a record starting at the beginning of `data`.
    pub fn parse(&'static self, data: impl Into<Bytes>) -> Result<Structure> {
        self.parse_at(data.into(), 0)
    }

    /// Parse a record starting at `offset`. Slots keep absolute offsets into `data`.
    pub fn parse_at(&'static self, data: Bytes, offset: usize) -> Result<Structure> {
        if offset > data.len() {
            error!(
                "{} starts at {:#x}, past the end of a {} byte buffer",
                self.name,
                offset,
                data.len()
            );
            return Err(DataError::malformed(
                self.name,
                format!("offset {offset:#x} beyond buffer of {} bytes", data.len()),
            ));
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(self.fields.len());
        let mut cursor = offset;
        for field in self.fields {
            let view = RecordView::new(self, &data, &slots);
            let kind = resolve_kind(self, field, &view)?;
            let (len, shape) = match kind {
                FieldKind::Scalar(primitive) => (primitive.size(), Shape::Scalar(primitive)),
                FieldKind::Array(primitive, count) => {
                    let count = resolve_count(self, field, count, &view)?;
                    let len = byte_len(self, field, count, primitive.size())?;
                    (len, Shape::Array(primitive, count))
                }
                FieldKind::Records(schema, count) => {
                    let count = resolve_count(self, field, count, &view)?;
                    let len = byte_len(self, field, count, element_size(self, field, schema)?)?;
                    (len, Shape::Records(schema, count))
                }
                FieldKind::Bytes(count) => (resolve_count(self, field, count, &view)?, Shape::Bytes),
                FieldKind::Remaining => (data.len() - cursor, Shape::Bytes),
                FieldKind::Align(alignment) => (padding(cursor - offset, alignment), Shape::Padding),
                FieldKind::Dynamic(_) => return Err(nested_dynamic(self, field)),
            };

            let end = cursor
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    error!(
                        "{}.{} at {:#x} needs {} bytes, buffer has {}",
                        self.name,
                        field.name,
                        cursor,
                        len,
                        data.len()
                    );
                    DataError::malformed(
                        format!("{}.{}", self.name, field.name),
                        format!(
                            "needs {len} bytes at {cursor:#x}, only {} available",
                            data.len().saturating_sub(cursor)
                        ),
                    )
                })?;

            trace!("{}.{} at {:#x} ({} bytes)", self.name, field.name, cursor, len);
            slots.push(Slot {
                offset: cursor,
                len,
                shape,
            });
            cursor = end;
        }

        Ok(Structure::from_parts(self, data, offset, cursor, slots))
    }

    /// Lay out `values` in declaration order, then write back derived offsets.
    ///
    /// Missing values are zero-filled. Array and records values must match
    /// their resolved count exactly; byte values may be shorter than a fixed
    /// byte field and are zero-padded.
    pub fn construct(&'static self, values: FieldValues) -> Result<Structure> {
        if let Some(unknown) = values.names().find(|name| self.field_index(name).is_none()) {
            return Err(DataError::UnknownField {
                schema: self.name,
                field: unknown.to_owned(),
            });
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut slots: Vec<Slot> = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let view = RecordView::new(self, &buffer, &slots);
            let kind = resolve_kind(self, field, &view)?;
            let value = values.get(field.name);
            let offset = buffer.len();
            let shape = match kind {
                FieldKind::Scalar(primitive) => {
                    buffer.resize(offset + primitive.size(), 0);
                    if let Some(value) = value {
                        encode_scalar(self, field, primitive, value, &mut buffer[offset..])?;
                    }
                    Shape::Scalar(primitive)
                }
                FieldKind::Array(primitive, count) => {
                    let count = resolve_count(self, field, count, &view)?;
                    write_array(self, field, primitive, count, value, &mut buffer)?;
                    Shape::Array(primitive, count)
                }
                FieldKind::Records(schema, count) => {
                    let count = resolve_count(self, field, count, &view)?;
                    write_records(self, field, schema, count, value, &mut buffer)?;
                    Shape::Records(schema, count)
                }
                FieldKind::Bytes(count) => {
                    let count = resolve_count(self, field, count, &view)?;
                    write_bytes(self, field, Some(count), value, &mut buffer)?;
                    Shape::Bytes
                }
                FieldKind::Remaining => {
                    write_bytes(self, field, None, value, &mut buffer)?;
                    Shape::Bytes
                }
                FieldKind::Align(alignment) => {
                    buffer.resize(offset + padding(offset, alignment), 0);
                    Shape::Padding
                }
                FieldKind::Dynamic(_) => return Err(nested_dynamic(self, field)),
            };
            slots.push(Slot {
                offset,
                len: buffer.len() - offset,
                shape,
            });
        }

        for (field, slot) in self.fields.iter().zip(&slots) {
            let Some(Derived::OffsetOf {
                target,
                zero_if_empty,
            }) = field.derived
            else {
                continue;
            };
            let target_index = self.field_index(target).ok_or_else(|| DataError::UnknownField {
                schema: self.name,
                field: target.to_owned(),
            })?;
            let target_slot = slots[target_index];
            let offset = if zero_if_empty && target_slot.len == 0 {
                0
            } else {
                target_slot.offset
            };
            let Shape::Scalar(primitive) = slot.shape else {
                return Err(mismatch(self, field.name, "derived fields must be scalars"));
            };
            debug!("{}.{} = {:#x} (offset of {})", self.name, field.name, offset, target);
            encode_scalar(
                self,
                field,
                primitive,
                &Value::Int(offset as i64),
                &mut buffer[slot.offset..slot.offset + slot.len],
            )?;
        }

        let end = buffer.len();
        Ok(Structure::from_parts(self, Bytes::from(buffer), 0, end, slots))
    }
}

fn resolve_kind(schema: &'static Schema, field: &FieldDef, view: &RecordView<'_>) -> Result<FieldKind> {
    match field.kind {
        FieldKind::Dynamic(choose) => match choose(view)? {
            FieldKind::Dynamic(_) => Err(nested_dynamic(schema, field)),
            kind => Ok(kind),
        },
        kind => Ok(kind),
    }
}

fn resolve_count(
    schema: &'static Schema,
    field: &FieldDef,
    count: Count,
    view: &RecordView<'_>,
) -> Result<usize> {
    let raw = match count {
        Count::Fixed(count) => return Ok(count),
        Count::Field(name) => view.int(name)?,
        Count::Computed(compute) => compute(view)?,
    };
    usize::try_from(raw).map_err(|_| {
        error!("{}.{} resolved to a negative count {}", schema.name, field.name, raw);
        DataError::malformed(
            format!("{}.{}", schema.name, field.name),
            format!("negative count {raw}"),
        )
    })
}

fn byte_len(schema: &'static Schema, field: &FieldDef, count: usize, size: usize) -> Result<usize> {
    count.checked_mul(size).ok_or_else(|| {
        DataError::malformed(
            format!("{}.{}", schema.name, field.name),
            format!("{count} elements of {size} bytes overflow"),
        )
    })
}

fn element_size(schema: &'static Schema, field: &FieldDef, element: &'static Schema) -> Result<usize> {
    element
        .fixed_size()
        .ok_or_else(|| mismatch(schema, field.name, format!("{} is not fixed-size", element.name)))
}

fn padding(position: usize, alignment: usize) -> usize {
    if alignment == 0 {
        0
    } else {
        (alignment - position % alignment) % alignment
    }
}

fn nested_dynamic(schema: &'static Schema, field: &FieldDef) -> DataError {
    mismatch(schema, field.name, "dynamic kind resolved to another dynamic kind")
}

fn encode_scalar(
    schema: &'static Schema,
    field: &FieldDef,
    primitive: Primitive,
    value: &Value,
    out: &mut [u8],
) -> Result<()> {
    match value {
        Value::Int(value) => encode_int(primitive, *value, out),
        Value::Float(value) if primitive.is_float() => {
            encode_float(primitive, *value, out);
            Ok(())
        }
        other => Err(mismatch(
            schema,
            field.name,
            format!("{} value for a {} field", other.kind_name(), primitive.name()),
        )),
    }
}

fn encode_int(primitive: Primitive, value: i64, out: &mut [u8]) -> Result<()> {
    let out_of_range = || DataError::ValueOutOfRange {
        value: value.to_string(),
        target: primitive.name(),
    };
    match primitive {
        Primitive::U8 => out[0] = u8::try_from(value).map_err(|_| out_of_range())?,
        Primitive::I8 => out[0] = i8::try_from(value).map_err(|_| out_of_range())? as u8,
        Primitive::U16 => {
            LittleEndian::write_u16(out, u16::try_from(value).map_err(|_| out_of_range())?);
        }
        Primitive::I16 => {
            LittleEndian::write_i16(out, i16::try_from(value).map_err(|_| out_of_range())?);
        }
        Primitive::U32 => {
            LittleEndian::write_u32(out, u32::try_from(value).map_err(|_| out_of_range())?);
        }
        Primitive::I32 => {
            LittleEndian::write_i32(out, i32::try_from(value).map_err(|_| out_of_range())?);
        }
        Primitive::U64 => LittleEndian::write_u64(out, value as u64),
        Primitive::I64 => LittleEndian::write_i64(out, value),
        Primitive::F32 | Primitive::F64 => encode_float(primitive, value as f64, out),
    }
    Ok(())
}

fn encode_float(primitive: Primitive, value: f64, out: &mut [u8]) {
    match primitive {
        Primitive::F64 => LittleEndian::write_f64(out, value),
        _ => LittleEndian::write_f32(out, value as f32),
    }
}

fn write_array(
    schema: &'static Schema,
    field: &FieldDef,
    primitive: Primitive,
    count: usize,
    value: Option<&Value>,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    let start = buffer.len();
    let size = primitive.size();
    buffer.resize(start + byte_len(schema, field, count, size)?, 0);
    let Some(value) = value else {
        return Ok(());
    };
    if value.element_count() != count {
        return Err(mismatch(
            schema,
            field.name,
            format!("expected {count} elements, got {}", value.element_count()),
        ));
    }

    let out = &mut buffer[start..];
    match value {
        Value::Ints(items) => {
            for (item, chunk) in items.iter().zip(out.chunks_exact_mut(size)) {
                encode_int(primitive, *item, chunk)?;
            }
        }
        Value::Floats(items) if primitive.is_float() => {
            for (item, chunk) in items.iter().zip(out.chunks_exact_mut(size)) {
                encode_float(primitive, *item, chunk);
            }
        }
        Value::Bytes(bytes) if size == 1 => out.copy_from_slice(bytes),
        other => {
            return Err(mismatch(
                schema,
                field.name,
                format!("{} value for an array of {}", other.kind_name(), primitive.name()),
            ));
        }
    }
    Ok(())
}

fn write_records(
    schema: &'static Schema,
    field: &FieldDef,
    element: &'static Schema,
    count: usize,
    value: Option<&Value>,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    let size = element_size(schema, field, element)?;
    let Some(value) = value else {
        buffer.resize(buffer.len() + byte_len(schema, field, count, size)?, 0);
        return Ok(());
    };
    let Value::Records(records) = value else {
        return Err(mismatch(
            schema,
            field.name,
            format!("{} value for records of {}", value.kind_name(), element.name),
        ));
    };
    if records.len() != count {
        return Err(mismatch(
            schema,
            field.name,
            format!("expected {count} records, got {}", records.len()),
        ));
    }
    for record in records {
        if !std::ptr::eq(record.schema(), element) || record.len() != size {
            return Err(mismatch(
                schema,
                field.name,
                format!(
                    "record of {} ({} bytes) where {} ({} bytes) was expected",
                    record.schema().name,
                    record.len(),
                    element.name,
                    size
                ),
            ));
        }
        buffer.extend_from_slice(&record.as_bytes());
    }
    Ok(())
}

fn write_bytes(
    schema: &'static Schema,
    field: &FieldDef,
    expected: Option<usize>,
    value: Option<&Value>,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    let start = buffer.len();
    match value {
        Some(Value::Bytes(bytes)) => {
            if let Some(expected) = expected {
                if bytes.len() > expected {
                    return Err(mismatch(
                        schema,
                        field.name,
                        format!("{} bytes do not fit in {expected}", bytes.len()),
                    ));
                }
            }
            buffer.extend_from_slice(bytes);
        }
        Some(other) => {
            return Err(mismatch(
                schema,
                field.name,
                format!("{} value for a byte field", other.kind_name()),
            ));
        }
        None => {}
    }
    if let Some(expected) = expected {
        buffer.resize(start + expected, 0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    static ENTRY: Schema = Schema::new(
        "Entry",
        &[
            FieldDef::scalar("id", Primitive::U16),
            FieldDef::scalar("weight", Primitive::F32),
        ],
    );

    fn body_len(view: &RecordView<'_>) -> Result<i64> {
        Ok(view.int("total")? - 4)
    }

    fn payload_kind(view: &RecordView<'_>) -> Result<FieldKind> {
        Ok(if view.int("wide")? != 0 {
            FieldKind::Array(Primitive::U32, Count::Fixed(2))
        } else {
            FieldKind::Array(Primitive::U16, Count::Fixed(2))
        })
    }

    static CONTAINER: Schema = Schema::new(
        "Container",
        &[
            FieldDef::scalar("entry_count", Primitive::U8),
            FieldDef::offset_of("entries_offset", Primitive::U32, "entries"),
            FieldDef::offset_of_non_empty("extra_offset", Primitive::U32, "extra"),
            FieldDef::scalar("total", Primitive::U16),
            FieldDef::new("pad", FieldKind::Align(4)),
            FieldDef::records("entries", &ENTRY, Count::Field("entry_count")),
            FieldDef::bytes("body", Count::Computed(body_len)),
            FieldDef::bytes("extra", Count::Fixed(0)),
            FieldDef::scalar("wide", Primitive::U8),
            FieldDef::new("payload", FieldKind::Dynamic(payload_kind)),
            FieldDef::new("rest", FieldKind::Remaining),
        ],
    );

    fn sample_values() -> FieldValues {
        let entries = vec![
            ENTRY
                .construct(FieldValues::new().with("id", 3u16).with("weight", 0.5f32))
                .unwrap(),
            ENTRY
                .construct(FieldValues::new().with("id", 9u16).with("weight", 2.0f32))
                .unwrap(),
        ];
        FieldValues::new()
            .with("entry_count", 2u8)
            .with("total", 6u16)
            .with("entries", entries)
            .with("body", vec![0xAAu8, 0xBB])
            .with("wide", 1u8)
            .with("payload", vec![10u32, 20])
            .with("rest", vec![1u8, 2, 3])
    }

    #[test]
    fn test_construct_then_parse() {
        let built = CONTAINER.construct(sample_values()).unwrap();
        // 1 + 4 + 4 + 2 = 11, aligned to 12
        assert_eq!(built.field_offset("entries").unwrap(), 12);
        assert_eq!(built.u32("entries_offset").unwrap(), 12);
        assert_eq!(built.u32("extra_offset").unwrap(), 0);

        let parsed = CONTAINER.parse(built.as_bytes()).unwrap();
        assert_eq!(parsed.len(), built.len());
        assert_eq!(parsed.count("entries").unwrap(), 2);
        let ids: Vec<u16> = parsed
            .records("entries")
            .unwrap()
            .map(|entry| entry.unwrap().u16("id").unwrap())
            .collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(parsed.record("entries", 1).unwrap().f32("weight").unwrap(), 2.0);
        assert_eq!(&parsed.bytes("body").unwrap()[..], &[0xAA, 0xBB]);
        assert_eq!(parsed.u32s("payload").unwrap(), vec![10, 20]);
        assert_eq!(&parsed.bytes("rest").unwrap()[..], &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_buffer_is_malformed() {
        let built = CONTAINER.construct(sample_values()).unwrap();
        let bytes = built.as_bytes();
        // cut into the payload: everything before it must still be resolvable
        let cut = bytes.slice(..built.field_offset("payload").unwrap() + 3);
        let err = CONTAINER.parse(cut).unwrap_err();
        assert!(err.is_malformed(), "{err}");
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let values = FieldValues::new().with("total", 2u16);
        let err = CONTAINER.construct(values).unwrap_err();
        assert!(err.is_malformed(), "{err}");
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let values = FieldValues::new()
            .with("total", 4u16)
            .with("payload", vec![1u16, 2, 3]);
        let err = CONTAINER.construct(values).unwrap_err();
        assert!(matches!(err, DataError::SchemaMismatch { field: "payload", .. }));
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let values = FieldValues::new().with("totl", 4u16);
        assert!(matches!(
            CONTAINER.construct(values),
            Err(DataError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_out_of_range_scalar() {
        let values = FieldValues::new().with("entry_count", 300u16);
        assert!(matches!(
            CONTAINER.construct(values),
            Err(DataError::ValueOutOfRange { target: "u8", .. })
        ));
    }

    #[test]
    fn test_u64_keeps_full_range() {
        static WIDE: Schema = Schema::new("Wide", &[FieldDef::scalar("hash", Primitive::U64)]);
        let built = WIDE.construct(FieldValues::new().with("hash", u64::MAX)).unwrap();
        assert_eq!(&built.as_bytes()[..], &[0xFF; 8]);
        let parsed = WIDE.parse(built.as_bytes()).unwrap();
        assert_eq!(parsed.int("hash").unwrap() as u64, u64::MAX);
    }

    #[test]
    fn test_missing_values_are_zero_filled() {
        let built = ENTRY.construct(FieldValues::new()).unwrap();
        assert_eq!(&built.as_bytes()[..], &[0u8; 6]);
    }

    #[test]
    fn test_parse_at_offset_reports_absolute_offsets() {
        let mut data = vec![0xFF; 4];
        data.extend_from_slice(&[7, 0, 0, 0, 0x80, 0x3F]);
        let entry = ENTRY.parse_at(Bytes::from(data), 4).unwrap();
        assert_eq!(entry.offset(), 4);
        assert_eq!(entry.field_offset("weight").unwrap(), 6);
        assert_eq!(entry.u16("id").unwrap(), 7);
        assert_eq!(entry.f32("weight").unwrap(), 1.0);
    }

    #[test]
    fn test_fixed_bytes_are_padded() {
        static NAME: Schema = Schema::new("Name", &[FieldDef::bytes("name", Count::Fixed(8))]);
        let built = NAME
            .construct(FieldValues::new().with("name", &b"abc"[..]))
            .unwrap();
        assert_eq!(built.len(), 8);
        assert_eq!(built.fixed_str("name").unwrap(), "abc");

        let too_long = NAME.construct(FieldValues::new().with("name", vec![1u8; 9]));
        assert!(too_long.is_err());
    }
}
