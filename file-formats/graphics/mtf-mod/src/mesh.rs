use mtf_data::prelude::*;

/// Level of detail tags of secondary mesh variants
pub const SECONDARY_LODS: [u8; 2] = [2, 252];

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MeshFlags: u8 {
        const UNK_01 = 1 << 0;
        const UNK_02 = 1 << 1;
        const UNK_03 = 1 << 2;
        const UNK_04 = 1 << 3;
        const UNK_05 = 1 << 4;
        const CAST_SHADOWS = 1 << 5;
        /// Cleared on high brightness meshes
        const UNK_06 = 1 << 6;
        const UNK_07 = 1 << 7;
    }
}

pub(crate) static MESH: Schema = Schema::new(
    "Mod156Mesh",
    &[
        FieldDef::scalar("render_group", Primitive::U16),
        FieldDef::scalar("material_index", Primitive::U16),
        FieldDef::scalar("constant", Primitive::U8),
        FieldDef::scalar("level_of_detail", Primitive::U8),
        FieldDef::scalar("z_order", Primitive::U8),
        FieldDef::scalar("vertex_format", Primitive::U8),
        FieldDef::scalar("vertex_stride", Primitive::U8),
        FieldDef::scalar("unk_02", Primitive::U8),
        FieldDef::scalar("unk_03", Primitive::U8),
        FieldDef::scalar("flags", Primitive::U8),
        FieldDef::scalar("vertex_count", Primitive::U16),
        FieldDef::scalar("vertex_index_end", Primitive::U16),
        FieldDef::scalar("vertex_index_start_1", Primitive::U32),
        FieldDef::scalar("vertex_offset", Primitive::U32),
        FieldDef::scalar("unk_05", Primitive::U32),
        FieldDef::scalar("face_position", Primitive::U32),
        FieldDef::scalar("face_count", Primitive::U32),
        FieldDef::scalar("face_offset", Primitive::U32),
        FieldDef::scalar("unk_06", Primitive::U8),
        FieldDef::scalar("unk_07", Primitive::U8),
        FieldDef::scalar("vertex_index_start_2", Primitive::U16),
        FieldDef::scalar("vertex_group_count", Primitive::U8),
        FieldDef::scalar("bone_palette_index", Primitive::U8),
        FieldDef::scalar("unk_08", Primitive::U8),
        FieldDef::scalar("unk_09", Primitive::U8),
        FieldDef::scalar("unk_10", Primitive::U16),
        FieldDef::scalar("unk_11", Primitive::U16),
    ],
);

/// Mesh descriptor: a vertex range, an index range and render settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mesh {
    pub render_group: u16,
    pub material_index: u16,
    /// Always 1 in shipped files
    pub constant: u8,
    pub level_of_detail: u8,
    pub z_order: u8,
    pub vertex_format: u8,
    pub vertex_stride: u8,
    pub unk_02: u8,
    pub unk_03: u8,
    pub flags: MeshFlags,
    pub vertex_count: u16,
    pub vertex_index_end: u16,
    pub vertex_index_start_1: u32,
    /// Byte offset added to the vertex range
    pub vertex_offset: u32,
    pub unk_05: u32,
    /// First index of the strip, in index buffer entries
    pub face_position: u32,
    /// Number of strip indices
    pub face_count: u32,
    pub face_offset: u32,
    pub unk_06: u8,
    pub unk_07: u8,
    pub vertex_index_start_2: u16,
    pub vertex_group_count: u8,
    pub bone_palette_index: u8,
    pub unk_08: u8,
    pub unk_09: u8,
    pub unk_10: u16,
    pub unk_11: u16,
}

impl Mesh {
    /// Settings new meshes start from.
    pub fn template() -> Self {
        Self {
            constant: 1,
            flags: MeshFlags::UNK_06,
            ..Self::default()
        }
    }

    /// First vertex of the mesh. The larger start marker wins.
    pub fn vertex_start(&self) -> u32 {
        self.vertex_index_start_1
            .max(u32::from(self.vertex_index_start_2))
    }

    /// Number of vertices to read.
    ///
    /// When the second start marker is the larger one, the range ends at
    /// `vertex_index_end` and the descriptor's own count is ignored. An end
    /// before the start yields 0.
    pub fn resolved_vertex_count(&self) -> usize {
        let start_2 = u32::from(self.vertex_index_start_2);
        if start_2 > self.vertex_index_start_1 {
            (u32::from(self.vertex_index_end) + 1).saturating_sub(start_2) as usize
        } else {
            usize::from(self.vertex_count)
        }
    }

    /// Byte offset of the first vertex inside the vertex buffer.
    pub fn vertex_byte_offset(&self) -> u64 {
        u64::from(self.vertex_start()) * u64::from(self.vertex_stride) + u64::from(self.vertex_offset)
    }

    /// Byte offset of the first strip index inside the index buffer.
    pub fn index_byte_offset(&self) -> u64 {
        u64::from(self.face_offset) * 2 + u64::from(self.face_position) * 2
    }

    pub fn casts_shadows(&self) -> bool {
        self.flags.contains(MeshFlags::CAST_SHADOWS)
    }

    /// Lower detail variant normally hidden by viewers.
    pub fn is_secondary_lod(&self) -> bool {
        SECONDARY_LODS.contains(&self.level_of_detail)
    }
}

impl SchemaRecord for Mesh {
    fn schema() -> &'static Schema {
        &MESH
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            render_group: structure.u16("render_group")?,
            material_index: structure.u16("material_index")?,
            constant: structure.u8("constant")?,
            level_of_detail: structure.u8("level_of_detail")?,
            z_order: structure.u8("z_order")?,
            vertex_format: structure.u8("vertex_format")?,
            vertex_stride: structure.u8("vertex_stride")?,
            unk_02: structure.u8("unk_02")?,
            unk_03: structure.u8("unk_03")?,
            flags: MeshFlags::from_bits_retain(structure.u8("flags")?),
            vertex_count: structure.u16("vertex_count")?,
            vertex_index_end: structure.u16("vertex_index_end")?,
            vertex_index_start_1: structure.u32("vertex_index_start_1")?,
            vertex_offset: structure.u32("vertex_offset")?,
            unk_05: structure.u32("unk_05")?,
            face_position: structure.u32("face_position")?,
            face_count: structure.u32("face_count")?,
            face_offset: structure.u32("face_offset")?,
            unk_06: structure.u8("unk_06")?,
            unk_07: structure.u8("unk_07")?,
            vertex_index_start_2: structure.u16("vertex_index_start_2")?,
            vertex_group_count: structure.u8("vertex_group_count")?,
            bone_palette_index: structure.u8("bone_palette_index")?,
            unk_08: structure.u8("unk_08")?,
            unk_09: structure.u8("unk_09")?,
            unk_10: structure.u16("unk_10")?,
            unk_11: structure.u16("unk_11")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("render_group", self.render_group)
            .with("material_index", self.material_index)
            .with("constant", self.constant)
            .with("level_of_detail", self.level_of_detail)
            .with("z_order", self.z_order)
            .with("vertex_format", self.vertex_format)
            .with("vertex_stride", self.vertex_stride)
            .with("unk_02", self.unk_02)
            .with("unk_03", self.unk_03)
            .with("flags", self.flags.bits())
            .with("vertex_count", self.vertex_count)
            .with("vertex_index_end", self.vertex_index_end)
            .with("vertex_index_start_1", self.vertex_index_start_1)
            .with("vertex_offset", self.vertex_offset)
            .with("unk_05", self.unk_05)
            .with("face_position", self.face_position)
            .with("face_count", self.face_count)
            .with("face_offset", self.face_offset)
            .with("unk_06", self.unk_06)
            .with("unk_07", self.unk_07)
            .with("vertex_index_start_2", self.vertex_index_start_2)
            .with("vertex_group_count", self.vertex_group_count)
            .with("bone_palette_index", self.bone_palette_index)
            .with("unk_08", self.unk_08)
            .with("unk_09", self.unk_09)
            .with("unk_10", self.unk_10)
            .with("unk_11", self.unk_11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_mesh_record_size() {
        assert_eq!(MESH.fixed_size(), Some(52));
    }

    #[test]
    fn test_mesh_round_trip() {
        let mesh = Mesh {
            material_index: 3,
            vertex_format: 4,
            vertex_stride: 32,
            flags: MeshFlags::CAST_SHADOWS | MeshFlags::UNK_06,
            vertex_count: 120,
            vertex_index_end: 219,
            vertex_index_start_1: 100,
            vertex_index_start_2: 100,
            face_position: 400,
            face_count: 333,
            bone_palette_index: 2,
            unk_11: 0xBEEF,
            ..Mesh::template()
        };
        let bytes = mesh.to_structure().unwrap().as_bytes();
        assert_eq!(bytes.len(), 52);
        assert_eq!(bytes[11], 0x60);
        assert_eq!(Mesh::parse(bytes).unwrap(), mesh);
    }

    #[test_case(10, 10, 5, 14, 5 ; "equal markers use the count")]
    #[test_case(10, 4, 5, 14, 5 ; "first marker larger uses the count")]
    #[test_case(4, 10, 7, 14, 5 ; "second marker larger uses the end")]
    #[test_case(0, 10, 7, 5, 0 ; "end before start is empty")]
    fn test_vertex_range(start_1: u32, start_2: u16, count: u16, end: u16, expected: usize) {
        let mesh = Mesh {
            vertex_index_start_1: start_1,
            vertex_index_start_2: start_2,
            vertex_count: count,
            vertex_index_end: end,
            vertex_stride: 32,
            vertex_offset: 16,
            ..Mesh::template()
        };
        assert_eq!(mesh.resolved_vertex_count(), expected);
        assert_eq!(
            mesh.vertex_byte_offset(),
            u64::from(start_1.max(u32::from(start_2))) * 32 + 16
        );
    }

    #[test]
    fn test_secondary_lod() {
        let mut mesh = Mesh::template();
        mesh.level_of_detail = 252;
        assert!(mesh.is_secondary_lod());
        mesh.level_of_detail = 255;
        assert!(!mesh.is_secondary_lod());
    }
}
