//! Sunken ruins: one ruin on the sea floor, sometimes with a cluster of
//! smaller ruins around it.

use crate::{
    assemble::{find_floor, FloorRule},
    piece::{load_template, BlitOptions, Painter, Piece, PieceKind},
    section::{expand, Batch, GenCtx, Section, Socket},
    Error,
};
use common::{
    generation::{ChunkSupplement, EntityInfo, EntityKind},
    ori::{Orientation, Rotation},
    terrain::{Block, BlockKind, Marker, Template, TemplateSource},
    util::PositionalRng,
    vol::ReadLevel,
};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::trace;
use vek::*;

const LARGE: [(&str, [i32; 3]); 2] = [("big_brick_1", [14, 7, 14]), ("big_brick_2", [16, 8, 12])];
const SMALL: [(&str, [i32; 3]); 3] = [
    ("brick_1", [8, 5, 8]),
    ("brick_2", [7, 6, 9]),
    ("brick_3", [9, 4, 7]),
];

/// Satellite spots around a large ruin, in units of the cluster spacing.
const CLUSTER: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

pub fn template_id(name: &str) -> String { format!("ruin/{}", name) }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuinPiece {
    pub template: String,
    /// Fraction of the template's voxels still standing.
    pub integrity: f32,
    pub large: bool,
}

impl RuinPiece {
    pub fn new(name: &str, integrity: f32, large: bool) -> Self {
        Self {
            template: template_id(name),
            integrity,
            large,
        }
    }

    fn loot_table(&self) -> &'static str {
        if self.large {
            "loot/underwater_ruin_big"
        } else {
            "loot/underwater_ruin_small"
        }
    }

    pub fn render(
        &self,
        painter: &mut Painter,
        templates: &dyn TemplateSource,
        seed: u32,
    ) -> Result<Vec<(Vec3<i32>, Marker)>, Error> {
        let template = load_template(templates, &self.template)?;
        Ok(painter.blit(&template, BlitOptions {
            skip_air: false,
            keep_liquids: true,
            integrity: Some((self.integrity, seed)),
        }))
    }

    pub fn handle_marker(
        &self,
        marker: &Marker,
        pos: Vec3<i32>,
        painter: &mut Painter,
        supplement: &mut ChunkSupplement,
        seed: u32,
    ) -> bool {
        match marker {
            Marker::Chest { loot } => {
                if painter.set_block(pos, Block::of(BlockKind::Chest)) {
                    let loot_seed = PositionalRng::derive(seed, pos).gen::<u64>();
                    supplement.add_loot(pos, loot.as_deref().unwrap_or(self.loot_table()), loot_seed);
                }
                true
            },
            Marker::Drowned => {
                // Large ruins are always guarded, small ones only sometimes
                let mut rng = PositionalRng::derive(seed, pos);
                if self.large || rng.gen_bool(0.5) {
                    supplement.add_entity(EntityInfo::at_block(pos, EntityKind::Drowned).into_persistent());
                }
                true
            },
            _ => false,
        }
    }
}

fn build_template(name: &str, size: Vec3<i32>, large: bool) -> Template {
    let max = size - 1;
    let mid = max / 2;
    let builder = Template::builder(size)
        .hollow(Block::of(BlockKind::Brick))
        // Roofless, with a doorway and cracked upper walls
        .fill(Vec3::new(1, max.y, 1), Vec3::new(max.x - 1, max.y, max.z - 1), Block::empty())
        .fill(Vec3::new(0, max.y - 1, 0), Vec3::new(max.x, max.y, 0), Block::of(BlockKind::CrackedBrick))
        .fill(Vec3::new(mid.x, 1, 0), Vec3::new(mid.x + 1, 2, 0), Block::empty());
    let builder = if large {
        builder
            .fill(Vec3::new(mid.x, 1, mid.z), Vec3::new(mid.x, max.y - 1, mid.z), Block::of(BlockKind::Pillar))
            .marker(Vec3::new(2, 1, 2), "chest")
            .marker(Vec3::new(mid.x + 1, 1, mid.z + 1), "drowned")
            .marker(Vec3::new(max.x - 2, 1, max.z - 2), "drowned")
    } else if name == "brick_1" {
        builder.marker(Vec3::new(1, 1, 1), "chest")
    } else if name == "brick_2" {
        builder.marker(Vec3::new(mid.x, 1, mid.z), "drowned")
    } else {
        builder
    };
    builder.build()
}

/// The templates of the ruins, built in code.
pub fn templates() -> Vec<(String, Template)> {
    LARGE
        .iter()
        .map(|entry| (entry, true))
        .chain(SMALL.iter().map(|entry| (entry, false)))
        .map(|((name, size), large)| (template_id(name), build_template(name, Vec3::from(*size), large)))
        .collect()
}

/// First water voxel above the sea floor, searching down from sea level.
fn sea_floor(level: &dyn ReadLevel, col: Vec2<i32>, sea_level: i32) -> Result<i32, Error> {
    find_floor(level, col, sea_level, level.min_height(), FloorRule::FluidAboveSolid)
        .ok_or(Error::NoViableAnchor { pos: col })
}

/// A single ruin, already seated on the floor.
pub struct RuinSection {
    pub piece: RuinPiece,
    pub anchor: Vec3<i32>,
    pub rotation: Rotation,
}

impl Section for RuinSection {
    type State = ();

    fn generate<R: Rng>(
        &self,
        ctx: &mut GenCtx<'_, R, ()>,
        _depth: u32,
        _parent: Socket,
        _offset: Option<Vec3<i32>>,
        _placed: &[Piece],
        out: &mut Batch,
    ) -> Result<bool, Error> {
        let piece = Piece::new(
            PieceKind::Ruin(self.piece.clone()),
            self.anchor,
            Orientation::rotation(self.rotation),
            ctx.templates,
        )?;
        out.push(piece);
        Ok(true)
    }
}

/// Lay out a ruin near the column of `origin`. Fails if the column has no
/// sea floor; satellites without one are left out.
pub fn generate<R: Rng>(
    ctx: &mut GenCtx<'_, R, ()>,
    level: &dyn ReadLevel,
    origin: Vec3<i32>,
    rotation: Rotation,
) -> Result<Vec<Piece>, Error> {
    let sea_level = ctx.settings.sea_level;
    let all_settings = ctx.settings;
    let settings = &all_settings.ruin;
    let large = ctx.rng.gen::<f32>() < settings.large_chance;
    let (name, integrity) = if large {
        (LARGE[ctx.rng.gen_range(0..LARGE.len())].0, settings.large_integrity)
    } else {
        (SMALL[ctx.rng.gen_range(0..SMALL.len())].0, settings.small_integrity)
    };

    let col = Vec2::new(origin.x, origin.z);
    let floor = sea_floor(level, col, sea_level)?;
    let mut root = Piece::new(
        PieceKind::Ruin(RuinPiece::new(name, integrity, large)),
        Vec3::new(origin.x, floor, origin.z),
        Orientation::rotation(rotation),
        ctx.templates,
    )?;
    root.lineage = Some(ctx.root_lineage());
    let mut pieces = vec![root];

    if large && ctx.rng.gen::<f32>() < settings.cluster_chance {
        let mut spots = CLUSTER.to_vec();
        spots.shuffle(ctx.rng);
        let count = ctx.rng.gen_range(4..=spots.len());
        // Satellites may not overlap the large ruin, nor each other
        let parent = pieces[0].socket().detached();
        for (dx, dz) in spots.into_iter().take(count) {
            let col = col + Vec2::new(dx, dz) * settings.cluster_spacing;
            let rotation = Rotation::random(ctx.rng);
            let name = SMALL[ctx.rng.gen_range(0..SMALL.len())].0;
            let floor = match sea_floor(level, col, sea_level) {
                Ok(floor) => floor,
                Err(e) => {
                    trace!(?e, "Leaving out satellite ruin");
                    continue;
                },
            };
            let section = RuinSection {
                piece: RuinPiece::new(name, settings.small_integrity, false),
                anchor: Vec3::new(col.x, floor, col.y),
                rotation,
            };
            expand(ctx, &section, 1, parent, None, &mut pieces)?;
        }
    }
    Ok(pieces)
}
