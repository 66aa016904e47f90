use glam::{Vec3, Vec4};

/// Four-byte tag at the start of every container.
pub type Magic = [u8; 4];

pub fn magic_to_string(magic: &Magic) -> String {
    let end = memchr::memchr(0, magic).unwrap_or(magic.len());
    String::from_utf8_lossy(&magic[..end]).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn zero() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }

    /// Smallest box containing every point, `None` for an empty set.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bbox, point| {
            Self::new(bbox.min.min(point), bbox.max.max(point))
        }))
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Map a point into `0..=1` per axis. Degenerate axes map to 0.
    pub fn normalize(&self, point: Vec3) -> Vec3 {
        let size = self.size();
        let relative = point - self.min;
        Vec3::new(
            if size.x == 0.0 { 0.0 } else { relative.x / size.x },
            if size.y == 0.0 { 0.0 } else { relative.y / size.y },
            if size.z == 0.0 { 0.0 } else { relative.z / size.z },
        )
    }

    /// Inverse of [`BoundingBox::normalize`].
    pub fn denormalize(&self, unit: Vec3) -> Vec3 {
        unit * self.size() + self.min
    }

    /// `min`/`max` as homogeneous vectors with the given `w`.
    pub fn to_vec4s(&self, w: f32) -> (Vec4, Vec4) {
        (self.min.extend(w), self.max.extend(w))
    }
}

/// Sphere centred on a box midpoint, radius reaching the farthest point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let bbox = BoundingBox::from_points(points.iter().copied())?;
        let center = bbox.center();
        let radius = points
            .iter()
            .map(|point| point.distance(center))
            .fold(0.0f32, f32::max);
        Some(Self::new(center, radius))
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.center.extend(self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bbox_from_points() {
        let bbox = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 5.0),
        ])
        .unwrap();
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 4.0, 5.0));
        assert_eq!(bbox.center(), Vec3::new(0.0, 1.0, 2.5));
        assert_eq!(bbox.half_extents(), Vec3::new(1.0, 3.0, 2.5));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_normalize_round_trip() {
        let bbox = BoundingBox::new(Vec3::new(-10.0, 0.0, 5.0), Vec3::new(10.0, 4.0, 5.0));
        let point = Vec3::new(5.0, 1.0, 5.0);
        let unit = bbox.normalize(point);
        assert_eq!(unit, Vec3::new(0.75, 0.25, 0.0));
        assert_eq!(bbox.denormalize(unit), point);
    }

    #[test]
    fn test_sphere_radius_is_farthest_point() {
        let points = [Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        let sphere = BoundingSphere::from_points(&points).unwrap();
        assert_eq!(sphere.center, Vec3::new(0.0, 0.5, 0.0));
        assert!((sphere.radius - (4.0f32 + 0.25).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_magic_to_string() {
        assert_eq!(magic_to_string(b"MOD\0"), "MOD");
        assert_eq!(magic_to_string(b"SBC1"), "SBC1");
    }
}
