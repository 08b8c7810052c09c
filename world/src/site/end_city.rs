//! Cities of towers joined by bridges, grown recursively out of templates.

use crate::{
    piece::{load_template, BlitOptions, Painter, Piece, PieceKind},
    section::{expand, Batch, GenCtx, Section, Socket},
    Error,
};
use common::{
    generation::{ChunkSupplement, EntityInfo, EntityKind},
    ori::{Orientation, Rotation},
    terrain::{Block, BlockKind, Marker, Template, TemplateSource},
    util::PositionalRng,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use vek::*;

const LOOT_TABLE: &str = "loot/end_city_treasure";

/// Bridges leaving a tower piece, as `(turn, attachment point)`.
const TOWER_BRIDGES: [(Rotation, [i32; 3]); 4] = [
    (Rotation::None, [1, -1, 0]),
    (Rotation::Clockwise90, [6, -1, 1]),
    (Rotation::CounterClockwise90, [0, -1, 5]),
    (Rotation::Clockwise180, [5, -1, 6]),
];

const FAT_TOWER_BRIDGES: [(Rotation, [i32; 3]); 4] = [
    (Rotation::None, [4, -1, 0]),
    (Rotation::Clockwise90, [12, -1, 4]),
    (Rotation::CounterClockwise90, [0, -1, 8]),
    (Rotation::Clockwise180, [8, -1, 12]),
];

/// Templates making up a city, with their sizes.
const TEMPLATES: [(&str, [i32; 3]); 19] = [
    ("base_floor", [10, 4, 10]),
    ("base_roof", [12, 2, 12]),
    ("second_floor_1", [12, 8, 12]),
    ("second_floor_2", [12, 8, 12]),
    ("second_roof", [14, 2, 14]),
    ("third_floor_1", [14, 8, 14]),
    ("third_floor_2", [14, 8, 14]),
    ("third_roof", [16, 2, 16]),
    ("tower_base", [7, 7, 7]),
    ("tower_piece", [7, 4, 7]),
    ("tower_top", [9, 5, 9]),
    ("bridge_end", [5, 6, 2]),
    ("bridge_piece", [5, 6, 4]),
    ("bridge_steep_stairs", [5, 10, 4]),
    ("bridge_gentle_stairs", [5, 10, 8]),
    ("fat_tower_base", [13, 4, 13]),
    ("fat_tower_middle", [13, 8, 13]),
    ("fat_tower_top", [17, 6, 17]),
    ("ship", [13, 24, 29]),
];

pub fn template_id(name: &str) -> String { format!("end_city/{}", name) }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndCityPiece {
    pub template: String,
    /// Whether the air of the template replaces what is already there.
    pub overwrite: bool,
}

impl EndCityPiece {
    pub fn new(name: &str, overwrite: bool) -> Self {
        Self {
            template: template_id(name),
            overwrite,
        }
    }

    pub fn render(
        &self,
        painter: &mut Painter,
        templates: &dyn TemplateSource,
    ) -> Result<Vec<(Vec3<i32>, Marker)>, Error> {
        let template = load_template(templates, &self.template)?;
        Ok(painter.blit(&template, BlitOptions {
            skip_air: !self.overwrite,
            ..BlitOptions::default()
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
                    supplement.add_loot(pos, loot.as_deref().unwrap_or(LOOT_TABLE), loot_seed);
                }
                true
            },
            Marker::Sentry => {
                supplement.add_entity(EntityInfo::at_block(pos, EntityKind::Sentry).into_persistent());
                true
            },
            Marker::Elytra => {
                supplement.add_entity(EntityInfo::at_block(pos, EntityKind::ItemFrame).into_persistent());
                true
            },
            _ => false,
        }
    }
}

fn purpur() -> Block { Block::of(BlockKind::Purpur) }

fn build_template(name: &str, size: Vec3<i32>) -> Template {
    let max = size - 1;
    let mid = max / 2;
    let builder = Template::builder(size);
    let builder = if name.ends_with("roof") {
        builder.platform(purpur())
    } else if name.starts_with("bridge") {
        // A deck with railings, rising along its length for the stairs
        let rise = if name.contains("stairs") { 4 } else { 0 };
        (0..size.z).fold(builder.platform(purpur()), |b, z| {
            let y = rise - (rise * z) / size.z.max(1);
            b.fill(Vec3::new(0, y, z), Vec3::new(max.x, y, z), purpur())
                .fill(Vec3::new(0, y + 1, z), Vec3::new(0, y + 1, z), Block::of(BlockKind::Fence))
                .fill(Vec3::new(max.x, y + 1, z), Vec3::new(max.x, y + 1, z), Block::of(BlockKind::Fence))
        })
    } else if name == "ship" {
        builder
            .hollow(purpur())
            .fill(Vec3::new(1, max.y - 6, 1), Vec3::new(max.x - 1, max.y, max.z - 1), Block::empty())
            .fill(Vec3::new(mid.x, 1, 2), Vec3::new(mid.x, max.y, 2), Block::of(BlockKind::Pillar))
    } else {
        [(0, 0), (max.x, 0), (0, max.z), (max.x, max.z)]
            .iter()
            .fold(builder.hollow(purpur()), |b, (x, z)| {
                b.fill(Vec3::new(*x, 0, *z), Vec3::new(*x, max.y, *z), Block::of(BlockKind::Pillar))
            })
            .fill(Vec3::new(mid.x, 1, 0), Vec3::new(mid.x, 2.min(max.y - 1), 0), Block::empty())
    };

    let builder = match name {
        "third_floor_2" => builder
            .marker(Vec3::new(2, 1, 2), "Chest")
            .marker(Vec3::new(max.x - 2, 1, max.z - 2), "Chest")
            .marker(Vec3::new(mid.x, 2, mid.z), "Sentry"),
        "fat_tower_top" => builder
            .marker(Vec3::new(3, 1, 3), "Chest")
            .marker(Vec3::new(mid.x, 2, mid.z), "Sentry"),
        "tower_top" => builder.marker(Vec3::new(mid.x, 2, mid.z), "Sentry"),
        "ship" => builder
            .marker(Vec3::new(mid.x, 1, max.z - 4), "Chest")
            .marker(Vec3::new(mid.x - 1, 1, max.z - 4), "Chest")
            .marker(Vec3::new(mid.x, 2, max.z - 1), "Elytra")
            .marker(Vec3::new(mid.x, max.y - 5, mid.z), "Sentry"),
        _ => builder,
    };
    builder.build()
}

/// The templates of a city, built in code.
pub fn templates() -> Vec<(String, Template)> {
    TEMPLATES
        .iter()
        .map(|(name, size)| (template_id(name), build_template(name, Vec3::from(*size))))
        .collect()
}

/// Whether some bridge of the city already ends in the ship.
#[derive(Clone, Debug, Default)]
pub struct EndCityState {
    pub ship_created: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndCitySection {
    HouseTower,
    Tower,
    TowerBridge,
    FatTower,
}

/// Add the piece `name` to `out`, at `offset` in the frame of `parent` and
/// turned by `turn` relative to it.
fn add<R: Rng>(
    ctx: &GenCtx<'_, R, EndCityState>,
    out: &mut Batch,
    parent: &Socket,
    offset: [i32; 3],
    name: &str,
    turn: Rotation,
    overwrite: bool,
) -> Result<Socket, Error> {
    let piece = Piece::new(
        PieceKind::EndCity(EndCityPiece::new(name, overwrite)),
        parent.attach(Vec3::from(offset)),
        parent.turned(turn),
        ctx.templates,
    )?;
    Ok(out.push(piece))
}

impl Section for EndCitySection {
    type State = EndCityState;

    fn generate<R: Rng>(
        &self,
        ctx: &mut GenCtx<'_, R, EndCityState>,
        depth: u32,
        parent: Socket,
        offset: Option<Vec3<i32>>,
        _placed: &[Piece],
        out: &mut Batch,
    ) -> Result<bool, Error> {
        let offset = offset.unwrap_or_else(Vec3::zero).into_array();
        match self {
            EndCitySection::HouseTower => {
                let base = add(ctx, out, &parent, offset, "base_floor", Rotation::None, true)?;
                match ctx.rng.gen_range(0..3) {
                    0 => {
                        add(ctx, out, &base, [-1, 4, -1], "base_roof", Rotation::None, true)?;
                    },
                    1 => {
                        let floor = add(ctx, out, &base, [-1, 0, -1], "second_floor_2", Rotation::None, false)?;
                        let roof = add(ctx, out, &floor, [-1, 8, -1], "second_roof", Rotation::None, false)?;
                        expand(ctx, &EndCitySection::Tower, depth + 1, roof, None, out.nested())?;
                    },
                    _ => {
                        let floor = add(ctx, out, &base, [-1, 0, -1], "second_floor_2", Rotation::None, false)?;
                        let floor = add(ctx, out, &floor, [-1, 4, -1], "third_floor_2", Rotation::None, false)?;
                        let roof = add(ctx, out, &floor, [-1, 8, -1], "third_roof", Rotation::None, true)?;
                        expand(ctx, &EndCitySection::Tower, depth + 1, roof, None, out.nested())?;
                    },
                }
                Ok(true)
            },
            EndCitySection::Tower => {
                let base_offset = [3 + ctx.rng.gen_range(0..2), -3, 3 + ctx.rng.gen_range(0..2)];
                let base = add(ctx, out, &parent, base_offset, "tower_base", Rotation::None, true)?;
                let mut top = add(ctx, out, &base, [0, 7, 0], "tower_piece", Rotation::None, true)?;
                let mut bridge_piece = (ctx.rng.gen_range(0..3) == 0).then_some(top);
                let height = 1 + ctx.rng.gen_range(0..3);
                for i in 0..height {
                    top = add(ctx, out, &top, [0, 4, 0], "tower_piece", Rotation::None, true)?;
                    if i < height - 1 && ctx.rng.gen::<bool>() {
                        bridge_piece = Some(top);
                    }
                }

                if let Some(bridge_piece) = bridge_piece {
                    for (turn, at) in TOWER_BRIDGES {
                        if ctx.rng.gen::<bool>() {
                            let end = add(ctx, out, &bridge_piece, at, "bridge_end", turn, true)?;
                            expand(ctx, &EndCitySection::TowerBridge, depth + 1, end, None, out.nested())?;
                        }
                    }
                } else if depth != 7 {
                    return Ok(expand(ctx, &EndCitySection::FatTower, depth + 1, top, None, out.nested())?
                        .is_accepted());
                }
                add(ctx, out, &top, [-1, 4, -1], "tower_top", Rotation::None, true)?;
                Ok(true)
            },
            EndCitySection::TowerBridge => {
                let segments = 1 + ctx.rng.gen_range(0..4);
                let mut end = add(ctx, out, &parent, [0, 0, -4], "bridge_piece", Rotation::None, true)?;
                let mut rise = 0;
                for _ in 0..segments {
                    if ctx.rng.gen::<bool>() {
                        end = add(ctx, out, &end, [0, rise, -4], "bridge_piece", Rotation::None, true)?;
                        rise = 0;
                    } else {
                        end = if ctx.rng.gen::<bool>() {
                            add(ctx, out, &end, [0, rise, -4], "bridge_steep_stairs", Rotation::None, true)?
                        } else {
                            add(ctx, out, &end, [0, rise, -8], "bridge_gentle_stairs", Rotation::None, true)?
                        };
                        rise = 4;
                    }
                }

                let ship_odds = 10u32.saturating_sub(depth).max(1);
                if !ctx.state.ship_created && ctx.rng.gen_range(0..ship_odds) == 0 {
                    let at = [-8 + ctx.rng.gen_range(0..8), rise, -70 + ctx.rng.gen_range(0..10)];
                    add(ctx, out, &end, at, "ship", Rotation::None, true)?;
                    ctx.state.ship_created = true;
                } else {
                    let house = Vec3::new(-3, rise + 1, -11);
                    if !expand(ctx, &EndCitySection::HouseTower, depth + 1, end, Some(house), out.nested())?
                        .is_accepted()
                    {
                        return Ok(false);
                    }
                }
                add(ctx, out, &end, [4, rise, 0], "bridge_end", Rotation::Clockwise180, true)?;
                Ok(true)
            },
            EndCitySection::FatTower => {
                let base = add(ctx, out, &parent, [-3, 4, -3], "fat_tower_base", Rotation::None, true)?;
                let mut top = add(ctx, out, &base, [0, 4, 0], "fat_tower_middle", Rotation::None, true)?;
                for _ in 0..2 {
                    if ctx.rng.gen_range(0..3) == 0 {
                        break;
                    }
                    top = add(ctx, out, &top, [0, 8, 0], "fat_tower_middle", Rotation::None, true)?;
                    for (turn, at) in FAT_TOWER_BRIDGES {
                        if ctx.rng.gen::<bool>() {
                            let end = add(ctx, out, &top, at, "bridge_end", turn, true)?;
                            expand(ctx, &EndCitySection::TowerBridge, depth + 1, end, None, out.nested())?;
                        }
                    }
                }
                add(ctx, out, &top, [-2, 8, -2], "fat_tower_top", Rotation::None, true)?;
                Ok(true)
            },
        }
    }
}

/// Lay out a whole city with its lowest floor at `origin`.
pub fn generate<R: Rng>(
    ctx: &mut GenCtx<'_, R, EndCityState>,
    origin: Vec3<i32>,
    rotation: Rotation,
) -> Result<Vec<Piece>, Error> {
    let lineage = ctx.root_lineage();
    let mut root = Batch::new(lineage, 0);
    let start = Socket::root(origin, Orientation::rotation(rotation));
    let base = add(ctx, &mut root, &start, [0, 0, 0], "base_floor", Rotation::None, true)?;
    let floor = add(ctx, &mut root, &base, [-1, 0, -1], "second_floor_1", Rotation::None, false)?;
    let floor = add(ctx, &mut root, &floor, [-1, 4, -1], "third_floor_1", Rotation::None, false)?;
    let roof = add(ctx, &mut root, &floor, [-1, 8, -1], "third_roof", Rotation::None, true)?;
    expand(ctx, &EndCitySection::Tower, 1, roof, None, root.nested())?;
    Ok(root.into_pieces())
}
