//! Cardinal rotations and mirroring about the vertical (`y`) axis.

use rand::Rng;
use serde::{Deserialize, Serialize};
use vek::*;

/// A rotation about the vertical axis, in quarter turns. Clockwise is as seen
/// from above: a clockwise quarter turn maps local `+z` onto `-x`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    pub fn random(rng: &mut impl Rng) -> Self { Self::ALL[rng.gen_range(0..4)] }

    /// Number of clockwise quarter turns.
    pub const fn turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    pub const fn from_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Rotation::None,
            1 => Rotation::Clockwise90,
            2 => Rotation::Clockwise180,
            _ => Rotation::CounterClockwise90,
        }
    }

    #[must_use]
    pub const fn rotated(self, by: Rotation) -> Self { Self::from_turns(self.turns() + by.turns()) }

    #[must_use]
    pub const fn inverse(self) -> Self { Self::from_turns(4 - self.turns()) }

    /// Rotate a horizontal offset `(dx, dz)`.
    pub fn rotate_offset(self, v: Vec2<i32>) -> Vec2<i32> {
        match self {
            Rotation::None => v,
            Rotation::Clockwise90 => Vec2::new(-v.y, v.x),
            Rotation::Clockwise180 => Vec2::new(-v.x, -v.y),
            Rotation::CounterClockwise90 => Vec2::new(v.y, -v.x),
        }
    }
}

/// Reflection applied before rotation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    /// Flips the `x` axis.
    FrontBack,
}

impl Mirror {
    pub const fn is_mirrored(self) -> bool { matches!(self, Mirror::FrontBack) }

    #[must_use]
    pub const fn then(self, other: Mirror) -> Self {
        if self.is_mirrored() != other.is_mirrored() {
            Mirror::FrontBack
        } else {
            Mirror::None
        }
    }

    pub fn mirror_offset(self, v: Vec2<i32>) -> Vec2<i32> {
        match self {
            Mirror::None => v,
            Mirror::FrontBack => Vec2::new(-v.x, v.y),
        }
    }
}

/// An element of the group of cardinal rotations and reflections about the
/// vertical axis. Applying it to a point mirrors first, then rotates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub mirror: Mirror,
    pub rotation: Rotation,
}

impl Orientation {
    pub const IDENTITY: Self = Self {
        mirror: Mirror::None,
        rotation: Rotation::None,
    };

    pub const fn new(mirror: Mirror, rotation: Rotation) -> Self { Self { mirror, rotation } }

    pub const fn rotation(rotation: Rotation) -> Self { Self::new(Mirror::None, rotation) }

    /// Apply to an offset relative to the origin.
    pub fn apply(&self, v: Vec3<i32>) -> Vec3<i32> {
        let h = self
            .rotation
            .rotate_offset(self.mirror.mirror_offset(Vec2::new(v.x, v.z)));
        Vec3::new(h.x, v.y, h.y)
    }

    /// `self.compose(inner)` applies `inner` first and then `self`.
    ///
    /// A reflection reverses the sense of any rotation applied before it, so
    /// `M * R == R⁻¹ * M`.
    #[must_use]
    pub fn compose(self, inner: Self) -> Self {
        let inner_rot = if self.mirror.is_mirrored() {
            inner.rotation.inverse()
        } else {
            inner.rotation
        };
        Self {
            mirror: self.mirror.then(inner.mirror),
            rotation: self.rotation.rotated(inner_rot),
        }
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        if self.mirror.is_mirrored() {
            // A reflected rotation is its own inverse.
            self
        } else {
            Self::rotation(self.rotation.inverse())
        }
    }

    /// Turn by an extra rotation in the local frame (mirror-aware).
    #[must_use]
    pub fn turned(self, by: Rotation) -> Self { self.compose(Self::rotation(by)) }
}

impl From<Rotation> for Orientation {
    fn from(rotation: Rotation) -> Self { Self::rotation(rotation) }
}

/// An [`Orientation`] applied about a pivot point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    pub orient: Orientation,
    pub pivot: Vec3<i32>,
}

impl Transform {
    pub const fn new(orient: Orientation, pivot: Vec3<i32>) -> Self { Self { orient, pivot } }

    pub fn apply(&self, pos: Vec3<i32>) -> Vec3<i32> {
        self.pivot + self.orient.apply(pos - self.pivot)
    }

    /// Both transforms must share a pivot for the result to be meaningful.
    #[must_use]
    pub fn compose(self, inner: Self) -> Self {
        debug_assert_eq!(self.pivot, inner.pivot);
        Self {
            orient: self.orient.compose(inner.orient),
            pivot: self.pivot,
        }
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        Self {
            orient: self.orient.inverse(),
            pivot: self.pivot,
        }
    }
}

/// Mirror then rotate `pos` about `pivot`.
pub fn rotate_mirror(
    pos: Vec3<i32>,
    mirror: Mirror,
    rotation: Rotation,
    pivot: Vec3<i32>,
) -> Vec3<i32> {
    Transform::new(Orientation::new(mirror, rotation), pivot).apply(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> impl Iterator<Item = Orientation> {
        [Mirror::None, Mirror::FrontBack].into_iter().flat_map(|mirror| {
            Rotation::ALL
                .into_iter()
                .map(move |rotation| Orientation::new(mirror, rotation))
        })
    }

    fn points() -> Vec<Vec3<i32>> {
        vec![
            Vec3::new(0, 0, 0),
            Vec3::new(1, 2, 3),
            Vec3::new(-7, 5, 11),
            Vec3::new(4, -3, -9),
        ]
    }

    #[test]
    fn quarter_turn() {
        assert_eq!(
            Orientation::rotation(Rotation::Clockwise90).apply(Vec3::new(0, 0, 1)),
            Vec3::new(-1, 0, 0)
        );
        assert_eq!(
            rotate_mirror(
                Vec3::new(5, 1, 0),
                Mirror::None,
                Rotation::Clockwise180,
                Vec3::new(2, 0, 0)
            ),
            Vec3::new(-1, 1, 0)
        );
    }

    #[test]
    fn inverse_round_trip() {
        for o in all() {
            for pivot in points() {
                let t = Transform::new(o, pivot);
                for p in points() {
                    assert_eq!(t.inverse().apply(t.apply(p)), p, "{:?}", o);
                    assert_eq!(t.apply(t.inverse().apply(p)), p, "{:?}", o);
                }
            }
            assert_eq!(o.compose(o.inverse()), Orientation::IDENTITY);
        }
    }

    #[test]
    fn compose_matches_sequential_application() {
        for a in all() {
            for b in all() {
                for p in points() {
                    assert_eq!(a.compose(b).apply(p), a.apply(b.apply(p)));
                }
            }
        }
    }

    #[test]
    fn compose_is_associative() {
        for a in all() {
            for b in all() {
                for c in all() {
                    assert_eq!(a.compose(b).compose(c), a.compose(b.compose(c)));
                }
            }
        }
    }
}
