use common::{
    ori::Orientation,
    terrain::{Block, BlockKind, Marker, Template},
    util::RandomField,
    vol::{UpdateFlags, WriteLevel},
    BoundingBox,
};
use vek::*;

/// How a template is stamped into the world.
#[derive(Copy, Clone, Debug)]
pub struct BlitOptions {
    /// Leave the world alone where the template holds air.
    pub skip_air: bool,
    /// Do not replace liquids with air.
    pub keep_liquids: bool,
    /// Fraction of the template's voxels that survive, and the seed that
    /// decides which ones do.
    pub integrity: Option<(f32, u32)>,
}

impl Default for BlitOptions {
    fn default() -> Self {
        Self {
            skip_air: false,
            keep_liquids: false,
            integrity: None,
        }
    }
}

/// Draws a piece in its own frame. Positions given to a painter are local to
/// the piece; every write outside of the clip box is dropped.
pub struct Painter<'a> {
    level: &'a mut dyn WriteLevel,
    clip: BoundingBox,
    anchor: Vec3<i32>,
    orient: Orientation,
    writes: usize,
}

impl<'a> Painter<'a> {
    pub fn new(
        level: &'a mut dyn WriteLevel,
        clip: BoundingBox,
        anchor: Vec3<i32>,
        orient: Orientation,
    ) -> Self {
        Self {
            level,
            clip,
            anchor,
            orient,
            writes: 0,
        }
    }

    /// Number of voxels written so far.
    pub fn writes(&self) -> usize { self.writes }

    pub fn world_pos(&self, local: Vec3<i32>) -> Vec3<i32> { self.anchor + self.orient.apply(local) }

    /// Voxels outside of the clip box read as air.
    pub fn get_block(&self, local: Vec3<i32>) -> Block {
        let pos = self.world_pos(local);
        if self.clip.contains(pos) {
            self.level.get(pos)
        } else {
            Block::empty()
        }
    }

    pub fn place_block(&mut self, block: Block, local: Vec3<i32>) {
        let pos = self.world_pos(local);
        self.set_block(pos, block);
    }

    /// Write a voxel at a world position. Returns whether it was written.
    pub fn set_block(&mut self, pos: Vec3<i32>, block: Block) -> bool {
        if !self.clip.contains(pos) || self.level.get(pos).is_indestructible() {
            return false;
        }
        self.level.set(pos, self.orient_block(block), UpdateFlags::NONE);
        self.writes += 1;
        true
    }

    /// Directional blocks face the same way relative to the piece whatever
    /// its orientation.
    fn orient_block(&self, block: Block) -> Block {
        if block.kind() != BlockKind::Stairs {
            return block;
        }
        let ori = block.get_ori();
        let ori = if self.orient.mirror.is_mirrored() {
            (4 - ori) % 4
        } else {
            ori
        };
        block.with_ori(ori + self.orient.rotation.turns())
    }

    /// Fill the box between two local corners, both inclusive. The outermost
    /// layer gets `edge`, everything inside it gets `interior`.
    pub fn fill_box(
        &mut self,
        min: Vec3<i32>,
        max: Vec3<i32>,
        edge: Block,
        interior: Block,
        keep_liquids: bool,
    ) {
        let local = BoundingBox::from_corners(min, max);
        for pos in local.iter() {
            let on_edge = (0..3).any(|i| pos[i] == local.min[i] || pos[i] == local.max[i]);
            let block = if on_edge { edge } else { interior };
            if keep_liquids && self.get_block(pos).is_liquid() {
                continue;
            }
            self.place_block(block, pos);
        }
    }

    /// Clear the box between two local corners.
    pub fn fill_air(&mut self, min: Vec3<i32>, max: Vec3<i32>) {
        self.fill_box(min, max, Block::empty(), Block::empty(), false);
    }

    /// Like [`Painter::fill_box`] with a single block, but each voxel is
    /// only placed with the given chance.
    pub fn fill_random(
        &mut self,
        min: Vec3<i32>,
        max: Vec3<i32>,
        field: &RandomField,
        chance: f32,
        block: Block,
    ) {
        for pos in BoundingBox::from_corners(min, max).iter() {
            if field.chance(self.world_pos(pos), chance) {
                self.place_block(block, pos);
            }
        }
    }

    /// Extend a support down from a local position until it hits solid
    /// ground or the bottom of the world. The whole column is walked, only the
    /// part of it inside the clip box is written.
    pub fn fill_column_down(&mut self, block: Block, local: Vec3<i32>) {
        let mut pos = self.world_pos(local);
        let floor = self.level.min_height();
        while pos.y > floor && self.level.get(pos).is_fluid() {
            self.set_block(pos, block);
            pos.y -= 1;
        }
    }

    /// Stamp a template at the painter's anchor. Returns the markers that lie
    /// inside the clip box, at their world positions.
    pub fn blit(&mut self, template: &Template, opts: BlitOptions) -> Vec<(Vec3<i32>, Marker)> {
        let decay = opts.integrity.map(|(integrity, seed)| (integrity, RandomField::new(seed)));
        for (local, block) in template.blocks.iter() {
            let pos = self.world_pos(*local);
            if !self.clip.contains(pos) {
                continue;
            }
            if block.is_air() {
                if opts.skip_air || (opts.keep_liquids && self.level.get(pos).is_liquid()) {
                    continue;
                }
            } else if let Some((integrity, field)) = &decay {
                if !field.chance(pos, *integrity) {
                    continue;
                }
            }
            self.set_block(pos, *block);
        }

        template
            .markers
            .iter()
            .map(|(local, marker)| (self.world_pos(*local), marker.clone()))
            .filter(|(pos, _)| self.clip.contains(*pos))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ori::Rotation, vol::{ReadLevel, SparseLevel}};

    fn brick() -> Block { Block::of(BlockKind::Brick) }

    #[test]
    fn fill_box_is_hollow_inside() {
        let mut level = SparseLevel::new();
        let mut painter = Painter::new(&mut level, BoundingBox::infinite(), Vec3::zero(), Orientation::IDENTITY);
        painter.fill_box(Vec3::zero(), Vec3::broadcast(2), brick(), Block::water(), false);
        assert_eq!(painter.writes(), 27);
        assert_eq!(level.get(Vec3::one()), Block::water());
        assert_eq!(level.get(Vec3::new(0, 1, 1)), brick());
    }

    #[test]
    fn writes_outside_the_clip_are_dropped() {
        let mut level = SparseLevel::new();
        let clip = BoundingBox::from_corners(Vec3::zero(), Vec3::new(15, 255, 15));
        let mut painter = Painter::new(&mut level, clip, Vec3::new(12, 10, 0), Orientation::IDENTITY);
        painter.fill_box(Vec3::zero(), Vec3::new(7, 0, 0), brick(), brick(), false);
        assert_eq!(painter.writes(), 4);
        assert_eq!(painter.get_block(Vec3::new(6, 0, 0)), Block::empty());
        assert!(level.written().all(|(pos, _)| clip.contains(pos)));
    }

    #[test]
    fn liquids_are_kept_when_asked() {
        let mut level = SparseLevel::flat(Block::of(BlockKind::Sand), 40, Block::water());
        let mut painter = Painter::new(&mut level, BoundingBox::infinite(), Vec3::new(0, 45, 0), Orientation::IDENTITY);
        painter.fill_box(Vec3::zero(), Vec3::new(4, 4, 4), brick(), Block::empty(), true);
        assert_eq!(painter.writes(), 0);
        painter.fill_box(Vec3::zero(), Vec3::new(4, 4, 4), brick(), Block::empty(), false);
        assert_eq!(level.get(Vec3::new(2, 47, 2)), Block::empty());
        assert_eq!(level.get(Vec3::new(0, 45, 0)), brick());
    }

    #[test]
    fn columns_stop_at_the_ground() {
        let mut level = SparseLevel::flat(Block::of(BlockKind::Rock), 50, Block::empty());
        let mut painter = Painter::new(&mut level, BoundingBox::infinite(), Vec3::new(3, 60, 3), Orientation::IDENTITY);
        painter.fill_column_down(brick(), Vec3::new(1, -1, 1));
        assert_eq!(painter.writes(), 10);
        assert_eq!(level.get(Vec3::new(4, 50, 4)), brick());
        assert_eq!(level.get(Vec3::new(4, 49, 4)), Block::of(BlockKind::Rock));
    }

    #[test]
    fn columns_reach_into_a_lower_clip() {
        let mut level = SparseLevel::flat(Block::of(BlockKind::Rock), 50, Block::empty());
        let clip = BoundingBox::from_corners(Vec3::new(0, 0, 0), Vec3::new(15, 54, 15));
        let mut painter = Painter::new(&mut level, clip, Vec3::new(3, 60, 3), Orientation::IDENTITY);
        painter.fill_column_down(brick(), Vec3::new(1, -1, 1));
        assert_eq!(painter.writes(), 5);
        assert_eq!(level.get(Vec3::new(4, 55, 4)), Block::empty());
        assert_eq!(level.get(Vec3::new(4, 54, 4)), brick());
        assert_eq!(level.get(Vec3::new(4, 50, 4)), brick());
    }

    #[test]
    fn stairs_turn_with_the_piece() {
        let mut level = SparseLevel::new();
        let orient = Orientation::rotation(Rotation::Clockwise90);
        let mut painter = Painter::new(&mut level, BoundingBox::infinite(), Vec3::zero(), orient);
        painter.place_block(Block::of(BlockKind::Stairs).with_ori(0), Vec3::zero());
        assert_eq!(level.get(Vec3::zero()).get_ori(), 1);
    }

    #[test]
    fn blit_skips_air_and_reports_markers() {
        let template = Template::builder(Vec3::new(3, 3, 3))
            .hollow(brick())
            .marker(Vec3::one(), "Chest")
            .build();
        let mut level = SparseLevel::flat(Block::of(BlockKind::Rock), 2, Block::empty());
        let mut painter = Painter::new(&mut level, BoundingBox::infinite(), Vec3::zero(), Orientation::IDENTITY);
        let markers = painter.blit(&template, BlitOptions {
            skip_air: true,
            ..BlitOptions::default()
        });
        assert_eq!(markers, vec![(Vec3::one(), Marker::Chest { loot: None })]);
        assert_eq!(painter.writes(), 26);
        assert_eq!(level.get(Vec3::one()), Block::of(BlockKind::Rock));
    }
}
