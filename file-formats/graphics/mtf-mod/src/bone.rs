use glam::Vec3;
use mtf_data::prelude::*;

/// Parent index marking a root bone
pub const ROOT_PARENT: u8 = 255;

/// Bones addressable by one palette
pub const MAX_PALETTE_BONES: usize = 32;

/// Entries in the animation mapping table
pub const ANIMATION_MAPPING_SIZE: usize = 256;

pub(crate) static BONE: Schema = Schema::new(
    "Mod156Bone",
    &[
        FieldDef::scalar("anim_map_index", Primitive::U8),
        FieldDef::scalar("parent_index", Primitive::U8),
        FieldDef::scalar("mirror_index", Primitive::U8),
        FieldDef::scalar("palette_index", Primitive::U8),
        FieldDef::scalar("unk_01", Primitive::F32),
        FieldDef::scalar("parent_distance", Primitive::F32),
        FieldDef::array("location", Primitive::F32, Count::Fixed(3)),
    ],
);

pub(crate) static BONE_PALETTE: Schema = Schema::new(
    "Mod156BonePalette",
    &[
        FieldDef::scalar("count", Primitive::U32),
        FieldDef::array("values", Primitive::U8, Count::Fixed(MAX_PALETTE_BONES)),
    ],
);

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub anim_map_index: u8,
    /// [`ROOT_PARENT`] for roots
    pub parent_index: u8,
    /// Index of the mirrored bone, the bone itself when unmirrored
    pub mirror_index: u8,
    pub palette_index: u8,
    pub unk_01: f32,
    pub parent_distance: f32,
    /// Offset from the parent bone
    pub location: Vec3,
}

impl Bone {
    pub fn is_root(&self) -> bool {
        self.parent_index == ROOT_PARENT
    }
}

impl SchemaRecord for Bone {
    fn schema() -> &'static Schema {
        &BONE
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            anim_map_index: structure.u8("anim_map_index")?,
            parent_index: structure.u8("parent_index")?,
            mirror_index: structure.u8("mirror_index")?,
            palette_index: structure.u8("palette_index")?,
            unk_01: structure.f32("unk_01")?,
            parent_distance: structure.f32("parent_distance")?,
            location: Vec3::from_array(structure.f32_array("location")?),
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("anim_map_index", self.anim_map_index)
            .with("parent_index", self.parent_index)
            .with("mirror_index", self.mirror_index)
            .with("palette_index", self.palette_index)
            .with("unk_01", self.unk_01)
            .with("parent_distance", self.parent_distance)
            .with("location", self.location.to_array())
    }
}

/// Up to 32 global bone indices addressed by per-vertex local indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonePalette {
    /// Number of meaningful entries in `values`
    pub count: u32,
    pub values: [u8; MAX_PALETTE_BONES],
}

impl BonePalette {
    /// Palette holding `bones` in order, zero padded.
    pub fn from_bones(bones: &[u8]) -> Self {
        let mut values = [0u8; MAX_PALETTE_BONES];
        let used = bones.len().min(MAX_PALETTE_BONES);
        values[..used].copy_from_slice(&bones[..used]);
        Self {
            count: used as u32,
            values,
        }
    }

    /// The meaningful entries.
    pub fn bones(&self) -> &[u8] {
        let used = (self.count as usize).min(MAX_PALETTE_BONES);
        &self.values[..used]
    }

    /// Global bone for a local index below the declared count.
    pub fn get(&self, local: u8) -> Option<u8> {
        self.bones().get(usize::from(local)).copied()
    }

    pub fn position(&self, bone: u8) -> Option<u8> {
        self.bones()
            .iter()
            .position(|&candidate| candidate == bone)
            .map(|index| index as u8)
    }
}

impl SchemaRecord for BonePalette {
    fn schema() -> &'static Schema {
        &BONE_PALETTE
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        let mut values = [0u8; MAX_PALETTE_BONES];
        values.copy_from_slice(&structure.u8s("values")?);
        Ok(Self {
            count: structure.u32("count")?,
            values,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("count", self.count)
            .with("values", self.values)
    }
}

/// Ancestors of a bone, nearest first.
///
/// Stops at a root, at a parent index outside the skeleton, or when the
/// chain loops back on itself.
pub fn bone_parents(bones: &[Bone], index: usize) -> Vec<u8> {
    let mut parents = Vec::new();
    let Some(mut bone) = bones.get(index) else {
        return parents;
    };
    while !bone.is_root() && parents.len() < bones.len() {
        let parent = bone.parent_index;
        parents.push(parent);
        match bones.get(usize::from(parent)) {
            Some(next) => bone = next,
            None => break,
        }
    }
    parents
}

/// Model-space head of every bone, accumulated along the parent chain.
pub fn bone_world_positions(bones: &[Bone]) -> Vec<Vec3> {
    (0..bones.len())
        .map(|index| {
            bone_parents(bones, index)
                .iter()
                .filter_map(|&parent| bones.get(usize::from(parent)))
                .fold(bones[index].location, |position, parent| {
                    position + parent.location
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bone(parent_index: u8, location: Vec3) -> Bone {
        Bone {
            anim_map_index: 0,
            parent_index,
            mirror_index: 0,
            palette_index: 0,
            unk_01: 0.0,
            parent_distance: location.length(),
            location,
        }
    }

    fn chain() -> Vec<Bone> {
        vec![
            bone(ROOT_PARENT, Vec3::new(0.0, 100.0, 0.0)),
            bone(0, Vec3::new(0.0, 10.0, 0.0)),
            bone(1, Vec3::new(5.0, 0.0, 0.0)),
            bone(ROOT_PARENT, Vec3::new(1.0, 1.0, 1.0)),
        ]
    }

    #[test]
    fn test_bone_record_size() {
        assert_eq!(BONE.fixed_size(), Some(24));
        assert_eq!(BONE_PALETTE.fixed_size(), Some(36));
    }

    #[test]
    fn test_parents_nearest_first() {
        let bones = chain();
        assert_eq!(bone_parents(&bones, 2), vec![1, 0]);
        assert_eq!(bone_parents(&bones, 0), Vec::<u8>::new());
        assert_eq!(bone_parents(&bones, 3), Vec::<u8>::new());
        assert_eq!(bone_parents(&bones, 9), Vec::<u8>::new());
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let bones = vec![bone(1, Vec3::ZERO), bone(0, Vec3::ZERO)];
        assert_eq!(bone_parents(&bones, 0).len(), 2);
    }

    #[test]
    fn test_world_positions_accumulate() {
        let positions = bone_world_positions(&chain());
        assert_eq!(positions[0], Vec3::new(0.0, 100.0, 0.0));
        assert_eq!(positions[1], Vec3::new(0.0, 110.0, 0.0));
        assert_eq!(positions[2], Vec3::new(5.0, 110.0, 0.0));
        assert_eq!(positions[3], Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_palette_lookup() {
        let palette = BonePalette::from_bones(&[7, 3, 12]);
        assert_eq!(palette.count, 3);
        assert_eq!(palette.get(1), Some(3));
        assert_eq!(palette.get(3), None);
        assert_eq!(palette.position(12), Some(2));
        assert_eq!(palette.position(0), None);

        let parsed = BonePalette::parse(palette.to_structure().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, palette);
    }
}
