use crate::ori::{Orientation, Transform};
use serde::{Deserialize, Serialize};
use std::fmt;
use vek::*;

/// An axis-aligned box of voxels. Both `min` and `max` are *inclusive*, unlike
/// vek's [`Aabb`], so a box with `min == max` covers exactly one voxel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3<i32>,
    pub max: Vec3<i32>,
}

impl fmt::Debug for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BoundingBox[({}, {}, {}) -> ({}, {}, {})]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

impl BoundingBox {
    /// Normalizes unordered corners.
    pub fn from_corners(a: Vec3<i32>, b: Vec3<i32>) -> Self {
        Self {
            min: Vec3::partial_min(a, b),
            max: Vec3::partial_max(a, b),
        }
    }

    /// Box covering `size` voxels starting at `origin`. Sizes are clamped to at
    /// least one voxel.
    pub fn from_origin_size(origin: Vec3<i32>, size: Vec3<i32>) -> Self {
        Self {
            min: origin,
            max: origin + size.map(|e| e.max(1)) - 1,
        }
    }

    /// The box that a local-space box `(0, 0, 0)..size` covers once oriented and
    /// placed at `anchor`.
    pub fn oriented(anchor: Vec3<i32>, size: Vec3<i32>, orient: Orientation) -> Self {
        let local = Self::from_origin_size(Vec3::zero(), size);
        local.transformed(&Transform::new(orient, Vec3::zero())).translated(anchor)
    }

    pub fn infinite() -> Self {
        Self {
            min: Vec3::broadcast(i32::MIN),
            max: Vec3::broadcast(i32::MAX),
        }
    }

    /// Span per axis.
    pub fn size(&self) -> Vec3<i32> { self.max - self.min + 1 }

    pub fn center(&self) -> Vec3<i32> {
        (self.min + self.max).map(|e| e.div_euclid(2))
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Horizontal overlap only.
    pub fn intersects_xz(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        self.intersects(other).then(|| Self {
            min: Vec3::partial_max(self.min, other.min),
            max: Vec3::partial_min(self.max, other.max),
        })
    }

    pub fn contains(&self, pos: Vec3<i32>) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Grow to cover `other` as well.
    pub fn encapsulate(&mut self, other: &Self) {
        self.min = Vec3::partial_min(self.min, other.min);
        self.max = Vec3::partial_max(self.max, other.max);
    }

    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.encapsulate(other);
        self
    }

    #[must_use]
    pub fn translated(&self, by: Vec3<i32>) -> Self {
        Self {
            min: self.min + by,
            max: self.max + by,
        }
    }

    #[must_use]
    pub fn inflated(&self, by: i32) -> Self {
        Self {
            min: self.min - by,
            max: self.max + by,
        }
    }

    pub fn transformed(&self, transform: &Transform) -> Self {
        Self::from_corners(transform.apply(self.min), transform.apply(self.max))
    }

    pub fn corners(&self) -> [Vec3<i32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Iterate over every voxel in the box, `x` fastest.
    pub fn iter(&self) -> impl Iterator<Item = Vec3<i32>> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| Vec3::new(x, y, z)))
        })
    }
}

impl From<BoundingBox> for Aabb<i32> {
    fn from(bb: BoundingBox) -> Self {
        Aabb {
            min: bb.min,
            max: bb.max + 1,
        }
    }
}

impl From<Aabb<i32>> for BoundingBox {
    fn from(aabb: Aabb<i32>) -> Self {
        let aabb = aabb.made_valid();
        Self::from_corners(aabb.min, aabb.max - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ori::{Mirror, Rotation};

    fn bb(a: (i32, i32, i32), b: (i32, i32, i32)) -> BoundingBox {
        BoundingBox::from_corners(Vec3::from(a), Vec3::from(b))
    }

    #[test]
    fn corners_are_normalized() {
        let b = bb((5, 1, -2), (0, 3, -8));
        assert_eq!(b.min, Vec3::new(0, 1, -8));
        assert_eq!(b.max, Vec3::new(5, 3, -2));
        assert_eq!(b.size(), Vec3::new(6, 3, 7));
    }

    #[test]
    fn intersection_is_inclusive_and_symmetric() {
        let boxes = [
            bb((0, 0, 0), (4, 4, 4)),
            bb((4, 4, 4), (8, 8, 8)),
            bb((5, 0, 0), (9, 4, 4)),
            bb((-3, 2, 1), (0, 2, 1)),
            bb((2, -10, 2), (2, 10, 2)),
        ];
        for a in &boxes {
            assert!(a.intersects(a));
            for b in &boxes {
                assert_eq!(a.intersects(b), b.intersects(a));
            }
        }
        // Sharing a corner voxel counts
        assert!(boxes[0].intersects(&boxes[1]));
        // Adjacent faces without a shared voxel do not
        assert!(!boxes[0].intersects(&boxes[2]));
    }

    #[test]
    fn xz_overlap_ignores_height() {
        let column = bb((0, 0, 0), (15, 0, 15));
        assert!(column.intersects_xz(&bb((8, 100, 8), (20, 120, 20))));
        assert!(!column.intersects(&bb((8, 100, 8), (20, 120, 20))));
        assert!(!column.intersects_xz(&bb((16, 0, 0), (20, 0, 15))));
    }

    #[test]
    fn encapsulate_and_center() {
        let mut a = bb((0, 0, 0), (1, 1, 1));
        a.encapsulate(&bb((-4, 2, 3), (-3, 5, 3)));
        assert_eq!(a, bb((-4, 0, 0), (1, 5, 3)));
        assert_eq!(bb((-3, 0, 0), (0, 0, 0)).center(), Vec3::new(-2, 0, 0));
    }

    #[test]
    fn oriented_box_keeps_size() {
        let size = Vec3::new(5, 3, 9);
        for rotation in Rotation::ALL {
            for mirror in [Mirror::None, Mirror::FrontBack] {
                let b = BoundingBox::oriented(
                    Vec3::new(10, 64, -4),
                    size,
                    Orientation::new(mirror, rotation),
                );
                assert!(b.contains(Vec3::new(10, 64, -4)));
                assert_eq!(b.size().y, 3);
                assert_eq!(b.size().x * b.size().z, 45);
            }
        }
    }

    #[test]
    fn aabb_conversion() {
        let b = bb((1, 2, 3), (4, 5, 6));
        let aabb: Aabb<i32> = b.into();
        assert_eq!(BoundingBox::from(aabb), b);
        assert_eq!(b.iter().count() as i32, b.size().product());
    }
}
