//! Access to the voxel world, as seen by structure generation.

use crate::{
    bounds::BoundingBox,
    terrain::{Block, Fluid},
};
use hashbrown::HashMap;
use vek::*;

/// Which height map a column query samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeightKind {
    /// Highest non-air voxel.
    Surface,
    /// Highest voxel that is neither air nor liquid.
    OceanFloor,
}

/// Flags passed along with block writes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateFlags {
    /// Notify neighbouring blocks of the change.
    pub notify: bool,
}

impl UpdateFlags {
    pub const NONE: Self = Self { notify: false };
}

/// Read access to the voxel world.
pub trait ReadLevel {
    fn get(&self, pos: Vec3<i32>) -> Block;

    /// The `y` of the first voxel *above* the height map for this column.
    fn height(&self, col: Vec2<i32>, kind: HeightKind) -> i32;

    fn fluid(&self, pos: Vec3<i32>) -> Option<Fluid> { Fluid::from_block(self.get(pos)) }

    /// Lowest `y` that holds voxels.
    fn min_height(&self) -> i32 { 0 }
}

/// Write access to the voxel world.
pub trait WriteLevel: ReadLevel {
    fn set(&mut self, pos: Vec3<i32>, block: Block, flags: UpdateFlags);
}

/// A sparse, unbounded voxel volume. Voxels that were never written read as
/// `default`, or as `ground` below `ground_level`. Only `ground` and written
/// voxels count towards height maps.
#[derive(Clone, Debug)]
pub struct SparseLevel {
    blocks: HashMap<Vec3<i32>, Block>,
    default: Block,
    ground: Block,
    ground_level: i32,
    min_height: i32,
    writes: usize,
}

impl SparseLevel {
    /// An empty world of air.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            default: Block::empty(),
            ground: Block::empty(),
            ground_level: i32::MIN,
            min_height: 0,
            writes: 0,
        }
    }

    /// Flat `ground` below `ground_level`, `default` above it.
    pub fn flat(ground: Block, ground_level: i32, default: Block) -> Self {
        Self {
            ground,
            ground_level,
            default,
            ..Self::new()
        }
    }

    /// Number of writes performed so far.
    pub fn writes(&self) -> usize { self.writes }

    pub fn written(&self) -> impl Iterator<Item = (Vec3<i32>, Block)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, *block))
    }

    /// Bounds of every voxel written so far.
    pub fn written_bounds(&self) -> Option<BoundingBox> {
        self.blocks.keys().fold(None, |bounds, pos| {
            let cell = BoundingBox::from_corners(*pos, *pos);
            Some(bounds.map_or(cell, |b: BoundingBox| b.union(&cell)))
        })
    }

    fn base(&self, pos: Vec3<i32>) -> Block {
        if pos.y < self.ground_level {
            self.ground
        } else {
            self.default
        }
    }
}

impl Default for SparseLevel {
    fn default() -> Self { Self::new() }
}

impl ReadLevel for SparseLevel {
    fn get(&self, pos: Vec3<i32>) -> Block {
        self.blocks.get(&pos).copied().unwrap_or_else(|| self.base(pos))
    }

    fn height(&self, col: Vec2<i32>, kind: HeightKind) -> i32 {
        let counts = |block: Block| match kind {
            HeightKind::Surface => !block.is_air(),
            HeightKind::OceanFloor => block.is_filled(),
        };
        let written_top = self
            .blocks
            .iter()
            .filter(|(pos, block)| pos.x == col.x && pos.z == col.y && counts(**block))
            .map(|(pos, _)| pos.y + 1)
            .max();
        let base_top = if self.ground_level > i32::MIN && counts(self.ground) {
            // The first written voxel above the ground may have carved into it
            let mut y = self.ground_level;
            while y > self.min_height && !counts(self.get(Vec3::new(col.x, y - 1, col.y))) {
                y -= 1;
            }
            Some(y)
        } else {
            None
        };
        written_top
            .max(base_top)
            .unwrap_or(self.min_height)
    }

    fn min_height(&self) -> i32 { self.min_height }
}

impl WriteLevel for SparseLevel {
    fn set(&mut self, pos: Vec3<i32>, block: Block, _flags: UpdateFlags) {
        self.writes += 1;
        self.blocks.insert(pos, block);
    }
}
