//! Parser for MT Framework `SBC1` collision files.
//!
//! Read only. The file is a fixed header followed by four arrays whose
//! lengths come from the header: axis aligned box pairs, groups, triangles
//! and vertices.

use bytes::Bytes;
use glam::{Vec3, Vec4};
use log::debug;
use mtf_data::prelude::*;
use thiserror::Error;

pub const SBC_MAGIC: &[u8; 4] = b"SBC1";
pub const HEADER_SIZE: usize = 48;

#[derive(Debug, Error)]
pub enum SbcError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Unexpected magic value {0:?}, expected \"SBC1\"")]
    WrongMagic(String),
}

pub type Result<T> = std::result::Result<T, SbcError>;

static BOX: Schema = Schema::new(
    "SbcBox",
    &[
        FieldDef::array("a_min", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("a_max", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("b_min", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("b_max", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("ids", Primitive::U8, Count::Fixed(8)),
        FieldDef::array("extra", Primitive::I8, Count::Fixed(8)),
    ],
);

static GROUP: Schema = Schema::new(
    "SbcGroup",
    &[
        FieldDef::scalar("base", Primitive::U32),
        FieldDef::scalar("start_tris", Primitive::U32),
        FieldDef::scalar("start_boxes", Primitive::U32),
        FieldDef::scalar("start_vertices", Primitive::U32),
        FieldDef::scalar("group_id", Primitive::U32),
        FieldDef::array("box_a", Primitive::F32, Count::Fixed(6)),
        FieldDef::array("box_b", Primitive::F32, Count::Fixed(6)),
        FieldDef::array("box_c", Primitive::F32, Count::Fixed(6)),
        FieldDef::scalar("id_a", Primitive::U16),
        FieldDef::scalar("id_b", Primitive::U16),
    ],
);

static TRIANGLE: Schema = Schema::new(
    "SbcTriangle",
    &[
        FieldDef::array("indices", Primitive::U16, Count::Fixed(3)),
        FieldDef::array("attributes", Primitive::U16, Count::Fixed(11)),
    ],
);

static VERTEX: Schema = Schema::new(
    "SbcVertex",
    &[FieldDef::array("position", Primitive::F32, Count::Fixed(4))],
);

static SBC1: Schema = Schema::new(
    "Sbc1",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("unk_num_01", Primitive::U16),
        FieldDef::scalar("group_count", Primitive::U16),
        FieldDef::scalar("unk_num_02", Primitive::U16),
        FieldDef::scalar("unk_num_03", Primitive::U16),
        FieldDef::scalar("box_count", Primitive::U32),
        FieldDef::scalar("triangle_count", Primitive::U32),
        FieldDef::scalar("vertex_count", Primitive::U32),
        FieldDef::array("bbox", Primitive::F32, Count::Fixed(6)),
        FieldDef::records("boxes", &BOX, Count::Field("box_count")),
        FieldDef::records("groups", &GROUP, Count::Field("group_count")),
        FieldDef::records("triangles", &TRIANGLE, Count::Field("triangle_count")),
        FieldDef::records("vertices", &VERTEX, Count::Field("vertex_count")),
    ],
);

fn bbox_from(values: [f32; 6]) -> BoundingBox {
    BoundingBox::new(
        Vec3::new(values[0], values[1], values[2]),
        Vec3::new(values[3], values[4], values[5]),
    )
}

/// A pair of boxes with their opaque attribute bytes
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionBox {
    pub a_min: Vec4,
    pub a_max: Vec4,
    pub b_min: Vec4,
    pub b_max: Vec4,
    pub ids: [u8; 8],
    pub extra: [i8; 8],
}

impl SchemaRecord for CollisionBox {
    fn schema() -> &'static Schema {
        &BOX
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        let mut ids = [0u8; 8];
        ids.copy_from_slice(&structure.u8s("ids")?);
        let mut extra = [0i8; 8];
        for (slot, value) in extra.iter_mut().zip(structure.ints("extra")?) {
            *slot = value as i8;
        }
        Ok(Self {
            a_min: Vec4::from_array(structure.f32_array("a_min")?),
            a_max: Vec4::from_array(structure.f32_array("a_max")?),
            b_min: Vec4::from_array(structure.f32_array("b_min")?),
            b_max: Vec4::from_array(structure.f32_array("b_max")?),
            ids,
            extra,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("a_min", self.a_min.to_array())
            .with("a_max", self.a_max.to_array())
            .with("b_min", self.b_min.to_array())
            .with("b_max", self.b_max.to_array())
            .with("ids", self.ids.map(i64::from))
            .with("extra", self.extra)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionGroup {
    pub base: u32,
    pub start_triangles: u32,
    pub start_boxes: u32,
    pub start_vertices: u32,
    pub group_id: u32,
    pub box_a: BoundingBox,
    pub box_b: BoundingBox,
    pub box_c: BoundingBox,
    pub id_a: u16,
    pub id_b: u16,
}

impl SchemaRecord for CollisionGroup {
    fn schema() -> &'static Schema {
        &GROUP
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            base: structure.u32("base")?,
            start_triangles: structure.u32("start_tris")?,
            start_boxes: structure.u32("start_boxes")?,
            start_vertices: structure.u32("start_vertices")?,
            group_id: structure.u32("group_id")?,
            box_a: bbox_from(structure.f32_array("box_a")?),
            box_b: bbox_from(structure.f32_array("box_b")?),
            box_c: bbox_from(structure.f32_array("box_c")?),
            id_a: structure.u16("id_a")?,
            id_b: structure.u16("id_b")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        let flat = |bbox: &BoundingBox| {
            let (min, max) = (bbox.min.to_array(), bbox.max.to_array());
            [min[0], min[1], min[2], max[0], max[1], max[2]]
        };
        FieldValues::new()
            .with("base", self.base)
            .with("start_tris", self.start_triangles)
            .with("start_boxes", self.start_boxes)
            .with("start_vertices", self.start_vertices)
            .with("group_id", self.group_id)
            .with("box_a", flat(&self.box_a))
            .with("box_b", flat(&self.box_b))
            .with("box_c", flat(&self.box_c))
            .with("id_a", self.id_a)
            .with("id_b", self.id_b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionTriangle {
    pub indices: [u16; 3],
    /// Opaque per-face attributes
    pub attributes: [u16; 11],
}

impl SchemaRecord for CollisionTriangle {
    fn schema() -> &'static Schema {
        &TRIANGLE
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        let mut indices = [0u16; 3];
        indices.copy_from_slice(&structure.u16s("indices")?);
        let mut attributes = [0u16; 11];
        attributes.copy_from_slice(&structure.u16s("attributes")?);
        Ok(Self {
            indices,
            attributes,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("indices", self.indices)
            .with("attributes", self.attributes)
    }
}

/// A parsed collision file
#[derive(Debug, Clone, PartialEq)]
pub struct Sbc1 {
    pub unk_num_01: u16,
    pub unk_num_02: u16,
    pub unk_num_03: u16,
    pub bbox: BoundingBox,
    pub boxes: Vec<CollisionBox>,
    pub groups: Vec<CollisionGroup>,
    pub triangles: Vec<CollisionTriangle>,
    /// Homogeneous positions as stored
    pub vertices: Vec<Vec4>,
}

impl Sbc1 {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < 4 || &data[..4] != SBC_MAGIC {
            let found = String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned();
            return Err(SbcError::WrongMagic(found));
        }
        let sbc = SBC1.parse(data)?;
        let vertices = sbc
            .records("vertices")?
            .map(|vertex| -> mtf_data::Result<Vec4> {
                Ok(Vec4::from_array(vertex?.f32_array("position")?))
            })
            .collect::<mtf_data::Result<Vec<_>>>()?;

        let parsed = Self {
            unk_num_01: sbc.u16("unk_num_01")?,
            unk_num_02: sbc.u16("unk_num_02")?,
            unk_num_03: sbc.u16("unk_num_03")?,
            bbox: bbox_from(sbc.f32_array("bbox")?),
            boxes: sbc.records_as("boxes")?,
            groups: sbc.records_as("groups")?,
            triangles: sbc.records_as("triangles")?,
            vertices,
        };
        debug!(
            "SBC1: {} boxes, {} groups, {} triangles, {} vertices",
            parsed.boxes.len(),
            parsed.groups.len(),
            parsed.triangles.len(),
            parsed.vertices.len()
        );
        Ok(parsed)
    }

    /// Corner positions of a triangle, `None` when an index is out of range.
    pub fn triangle_positions(&self, triangle: &CollisionTriangle) -> Option<[Vec3; 3]> {
        let corner = |index: u16| self.vertices.get(index as usize).map(|v| v.truncate());
        Some([
            corner(triangle.indices[0])?,
            corner(triangle.indices[1])?,
            corner(triangle.indices[2])?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Sbc1, Bytes) {
        let sbc = Sbc1 {
            unk_num_01: 1,
            unk_num_02: 2,
            unk_num_03: 3,
            bbox: BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            boxes: vec![CollisionBox {
                a_min: Vec4::new(-1.0, -1.0, -1.0, 0.0),
                a_max: Vec4::new(1.0, 1.0, 1.0, 0.0),
                b_min: Vec4::ZERO,
                b_max: Vec4::ONE,
                ids: [1, 2, 3, 4, 5, 6, 7, 8],
                extra: [-1, 0, 1, 2, 3, 4, 5, -128],
            }],
            groups: vec![CollisionGroup {
                base: 0,
                start_triangles: 0,
                start_boxes: 0,
                start_vertices: 0,
                group_id: 9,
                box_a: BoundingBox::new(Vec3::ZERO, Vec3::ONE),
                box_b: BoundingBox::new(Vec3::ZERO, Vec3::ONE),
                box_c: BoundingBox::new(Vec3::ZERO, Vec3::ONE),
                id_a: 10,
                id_b: 11,
            }],
            triangles: vec![CollisionTriangle {
                indices: [0, 1, 2],
                attributes: [0; 11],
            }],
            vertices: vec![
                Vec4::new(0.0, 0.0, 0.0, 1.0),
                Vec4::new(1.0, 0.0, 0.0, 1.0),
                Vec4::new(0.0, 1.0, 0.0, 1.0),
            ],
        };
        let flat = [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0];
        let vertices: Vec<Structure> = sbc
            .vertices
            .iter()
            .map(|v| {
                VERTEX
                    .construct(FieldValues::new().with("position", v.to_array()))
                    .unwrap()
            })
            .collect();
        let bytes = SBC1
            .construct(
                FieldValues::new()
                    .with("magic", *SBC_MAGIC)
                    .with("unk_num_01", 1u16)
                    .with("group_count", 1u16)
                    .with("unk_num_02", 2u16)
                    .with("unk_num_03", 3u16)
                    .with("box_count", 1u32)
                    .with("triangle_count", 1u32)
                    .with("vertex_count", 3u32)
                    .with("bbox", flat)
                    .with("boxes", records_value(&sbc.boxes).unwrap())
                    .with("groups", records_value(&sbc.groups).unwrap())
                    .with("triangles", records_value(&sbc.triangles).unwrap())
                    .with("vertices", vertices),
            )
            .unwrap()
            .as_bytes();
        (sbc, bytes)
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(BOX.fixed_size(), Some(80));
        assert_eq!(GROUP.fixed_size(), Some(96));
        assert_eq!(TRIANGLE.fixed_size(), Some(28));
        assert_eq!(VERTEX.fixed_size(), Some(16));
    }

    #[test]
    fn test_parse() {
        let (expected, bytes) = sample();
        assert_eq!(bytes.len(), HEADER_SIZE + 80 + 96 + 28 + 3 * 16);
        let parsed = Sbc1::parse(bytes).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(
            parsed.triangle_positions(&parsed.triangles[0]),
            Some([Vec3::ZERO, Vec3::X, Vec3::Y])
        );
    }

    #[test]
    fn test_truncated_arrays() {
        let (_, bytes) = sample();
        let err = Sbc1::parse(bytes.slice(..bytes.len() - 1)).unwrap_err();
        assert!(matches!(err, SbcError::Data(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_wrong_magic() {
        assert!(matches!(
            Sbc1::parse(Bytes::from_static(b"SBC2")),
            Err(SbcError::WrongMagic(_))
        ));
    }

    #[test]
    fn test_triangle_out_of_range() {
        let (sbc, _) = sample();
        let triangle = CollisionTriangle {
            indices: [0, 1, 7],
            attributes: [0; 11],
        };
        assert!(sbc.triangle_positions(&triangle).is_none());
    }
}
