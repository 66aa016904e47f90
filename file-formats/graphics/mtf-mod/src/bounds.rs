use glam::{Mat4, Vec3, Vec4};
use mtf_data::prelude::*;

/// Bone id of the single bound written for a static mesh
pub const STATIC_BONE_ID: u32 = 255;

/// Filler the engine keeps in the opaque words of static bounds
pub const STATIC_BOUND_FILL: f32 = -431_602_080.0;

pub(crate) static WEIGHT_BOUND: Schema = Schema::new(
    "Mod156WeightBound",
    &[
        FieldDef::scalar("bone_id", Primitive::U32),
        FieldDef::array("unk_01", Primitive::F32, Count::Fixed(3)),
        FieldDef::array("sphere", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("bbox_min", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("bbox_max", Primitive::F32, Count::Fixed(4)),
        FieldDef::array("oabb_matrix", Primitive::F32, Count::Fixed(16)),
        FieldDef::array("oabb_dimension", Primitive::F32, Count::Fixed(4)),
    ],
);

/// Bounding volumes of the vertices a bone (or a static mesh) moves
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBound {
    pub bone_id: u32,
    pub unk_01: [f32; 3],
    /// Centre and radius
    pub sphere: Vec4,
    pub bbox_min: Vec4,
    pub bbox_max: Vec4,
    /// Oriented box transform, an identity rotation around the centre
    pub oabb_matrix: Mat4,
    /// Oriented box half extents
    pub oabb_dimension: Vec4,
}

impl WeightBound {
    /// Bounds of `points` expressed relative to `origin`.
    ///
    /// Only the bone head is subtracted, the bone's orientation does not
    /// enter the bound.
    ///
    /// `None` for an empty point set.
    pub fn from_points(bone_id: u32, points: &[Vec3], origin: Vec3) -> Option<Self> {
        let local: Vec<Vec3> = points.iter().map(|&point| point - origin).collect();
        let bbox = BoundingBox::from_points(local.iter().copied())?;
        let sphere = BoundingSphere::from_points(&local)?;
        let (bbox_min, bbox_max) = bbox.to_vec4s(0.0);
        Some(Self {
            bone_id,
            unk_01: if bone_id == STATIC_BONE_ID {
                [STATIC_BOUND_FILL; 3]
            } else {
                [0.0; 3]
            },
            sphere: sphere.to_vec4(),
            bbox_min,
            bbox_max,
            oabb_matrix: Mat4::from_translation(sphere.center),
            oabb_dimension: bbox.half_extents().extend(0.0),
        })
    }

    pub fn is_static(&self) -> bool {
        self.bone_id == STATIC_BONE_ID
    }
}

impl SchemaRecord for WeightBound {
    fn schema() -> &'static Schema {
        &WEIGHT_BOUND
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            bone_id: structure.u32("bone_id")?,
            unk_01: structure.f32_array("unk_01")?,
            sphere: Vec4::from_array(structure.f32_array("sphere")?),
            bbox_min: Vec4::from_array(structure.f32_array("bbox_min")?),
            bbox_max: Vec4::from_array(structure.f32_array("bbox_max")?),
            oabb_matrix: Mat4::from_cols_array(&structure.f32_array("oabb_matrix")?),
            oabb_dimension: Vec4::from_array(structure.f32_array("oabb_dimension")?),
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("bone_id", self.bone_id)
            .with("unk_01", self.unk_01)
            .with("sphere", self.sphere.to_array())
            .with("bbox_min", self.bbox_min.to_array())
            .with("bbox_max", self.bbox_max.to_array())
            .with("oabb_matrix", self.oabb_matrix.to_cols_array())
            .with("oabb_dimension", self.oabb_dimension.to_array())
    }
}

/// Model box and sphere of every point. Both are zero for no points.
pub fn model_bounds(points: &[Vec3]) -> (BoundingBox, BoundingSphere) {
    (
        BoundingBox::from_points(points.iter().copied()).unwrap_or_else(BoundingBox::zero),
        BoundingSphere::from_points(points).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_weight_bound_record_size() {
        assert_eq!(WEIGHT_BOUND.fixed_size(), Some(144));
    }

    #[test]
    fn test_bound_in_bone_space() {
        let points = [Vec3::new(10.0, 0.0, 0.0), Vec3::new(14.0, 2.0, 0.0)];
        let bound = WeightBound::from_points(3, &points, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        assert_eq!(bound.bbox_min, Vec4::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(bound.bbox_max, Vec4::new(4.0, 2.0, 0.0, 0.0));
        assert_eq!(bound.sphere.truncate(), Vec3::new(2.0, 1.0, 0.0));
        assert!((bound.sphere.w - 5.0f32.sqrt()).abs() < 1e-6);
        assert_eq!(bound.oabb_matrix.w_axis, Vec4::new(2.0, 1.0, 0.0, 1.0));
        assert_eq!(bound.oabb_dimension, Vec4::new(2.0, 1.0, 0.0, 0.0));
        assert_eq!(bound.unk_01, [0.0; 3]);

        let parsed = WeightBound::parse(bound.to_structure().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, bound);
    }

    #[test]
    fn test_static_bound_fill() {
        let bound = WeightBound::from_points(STATIC_BONE_ID, &[Vec3::ONE], Vec3::ZERO).unwrap();
        assert!(bound.is_static());
        assert_eq!(bound.unk_01, [STATIC_BOUND_FILL; 3]);
        assert!(WeightBound::from_points(0, &[], Vec3::ZERO).is_none());
    }

    #[test]
    fn test_model_bounds() {
        let (bbox, sphere) = model_bounds(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(sphere.radius, 1.0);
        let (empty, _) = model_bounds(&[]);
        assert_eq!(empty, BoundingBox::zero());
    }
}
