//! Greedy bone palette packing.

use std::collections::BTreeSet;

use log::debug;

use crate::bone::{BonePalette, MAX_PALETTE_BONES};
use crate::error::{ModError, Result};

/// Meshes sharing one palette and the bones they reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteGroup {
    pub meshes: Vec<usize>,
    /// Sorted global bone indices
    pub bones: BTreeSet<u8>,
}

impl PaletteGroup {
    pub fn to_palette(&self) -> BonePalette {
        BonePalette::from_bones(&self.bones.iter().copied().collect::<Vec<_>>())
    }
}

/// Group meshes into palettes of at most 32 bones, in input order.
///
/// A palette is closed as soon as adding the next mesh would push it past
/// 32 distinct bones. Fails with [`ModError::TooManyInfluences`] when a
/// single mesh needs more than 32 bones.
pub fn pack_bone_palettes(meshes: &[BTreeSet<u8>]) -> Result<Vec<PaletteGroup>> {
    let mut groups = Vec::new();
    let mut current = PaletteGroup::default();

    for (index, bones) in meshes.iter().enumerate() {
        if bones.len() > MAX_PALETTE_BONES {
            return Err(ModError::TooManyInfluences {
                mesh: index,
                bones: bones.len(),
                limit: MAX_PALETTE_BONES,
            });
        }

        let merged = current.bones.union(bones).count();
        if merged > MAX_PALETTE_BONES {
            debug!(
                "Closing bone palette {} with {} bones before mesh {}",
                groups.len(),
                current.bones.len(),
                index
            );
            groups.push(std::mem::take(&mut current));
        }
        current.meshes.push(index);
        current.bones.extend(bones.iter().copied());
    }

    groups.push(current);
    Ok(groups)
}

/// Palette index of every mesh.
pub fn palette_of_meshes(groups: &[PaletteGroup], mesh_count: usize) -> Vec<Option<usize>> {
    let mut assignment = vec![None; mesh_count];
    for (palette, group) in groups.iter().enumerate() {
        for &mesh in &group.meshes {
            if let Some(slot) = assignment.get_mut(mesh) {
                *slot = Some(palette);
            }
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn bones(range: std::ops::Range<u8>) -> BTreeSet<u8> {
        range.collect()
    }

    #[test]
    fn test_exactly_32_bones_fit() {
        let groups = pack_bone_palettes(&[bones(0..32)]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bones.len(), 32);
        assert_eq!(groups[0].to_palette().count, 32);
    }

    #[test]
    fn test_33_bones_in_one_mesh_fail() {
        let err = pack_bone_palettes(&[bones(0..4), bones(0..33)]).unwrap_err();
        assert!(matches!(
            err,
            ModError::TooManyInfluences {
                mesh: 1,
                bones: 33,
                limit: 32
            }
        ));
    }

    #[test]
    fn test_greedy_grouping_in_order() {
        let groups =
            pack_bone_palettes(&[bones(0..20), bones(10..30), bones(30..40), bones(0..5)]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].meshes, vec![0, 1]);
        assert_eq!(groups[0].bones, bones(0..30));
        assert_eq!(groups[1].meshes, vec![2, 3]);
        assert_eq!(groups[1].bones.len(), 15);
        assert_eq!(
            palette_of_meshes(&groups, 4),
            vec![Some(0), Some(0), Some(1), Some(1)]
        );
    }

    #[test]
    fn test_no_meshes_yields_one_empty_palette() {
        let groups = pack_bone_palettes(&[]).unwrap();
        assert_eq!(groups, vec![PaletteGroup::default()]);
    }

    proptest! {
        #[test]
        fn prop_palettes_hold_their_meshes(
            meshes in prop::collection::vec(prop::collection::btree_set(0u8..80, 0..=32), 1..20)
        ) {
            let groups = pack_bone_palettes(&meshes).unwrap();
            let assignment = palette_of_meshes(&groups, meshes.len());
            for group in &groups {
                prop_assert!(group.bones.len() <= MAX_PALETTE_BONES);
            }
            for (mesh, bones) in meshes.iter().enumerate() {
                let palette = assignment[mesh].unwrap();
                prop_assert!(bones.is_subset(&groups[palette].bones));
            }
        }
    }
}
