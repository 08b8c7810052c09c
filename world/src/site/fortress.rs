//! Fortresses of bridges and corridors, grown breadth first out of
//! parametric pieces.

use crate::{
    piece::{Painter, Piece, PieceKind, PieceState},
    section::{expand_breadth_first, Batch, GenCtx, Section, Socket},
    Error,
};
use common::{
    generation::{ChunkSupplement, EntityInfo, EntityKind},
    ori::{Orientation, Rotation},
    terrain::{Block, BlockKind},
    util::{PositionalRng, RandomField},
};
use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use vek::*;

const CHEST_LOOT: &str = "loot/fortress_bridge";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FortressKind {
    Start,
    BridgeStraight,
    BridgeCrossing,
    RoomCrossing,
    Corridor,
    CorridorStairs,
    Throne,
    BridgeEndFiller,
}

/// Where a piece continues, as a point just outside of it in its own frame,
/// and the turn the next piece takes relative to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Exit {
    pub at: Vec3<i32>,
    pub turn: Rotation,
}

const fn exit(x: i32, y: i32, z: i32, turn: Rotation) -> Exit {
    Exit {
        at: Vec3::new(x, y, z),
        turn,
    }
}

const CROSSING_EXITS: [Exit; 3] = [
    exit(9, 0, 19, Rotation::None),
    exit(-1, 0, 9, Rotation::Clockwise90),
    exit(19, 0, 9, Rotation::CounterClockwise90),
];
const ROOM_EXITS: [Exit; 3] = [
    exit(3, 0, 7, Rotation::None),
    exit(-1, 0, 3, Rotation::Clockwise90),
    exit(7, 0, 3, Rotation::CounterClockwise90),
];
const STRAIGHT_EXITS: [Exit; 1] = [exit(2, 0, 19, Rotation::None)];
const CORRIDOR_EXITS: [Exit; 1] = [exit(2, 0, 5, Rotation::None)];
const STAIRS_EXITS: [Exit; 1] = [exit(2, 7, 10, Rotation::None)];

impl FortressKind {
    pub fn size(self) -> Vec3<i32> {
        match self {
            FortressKind::Start | FortressKind::BridgeCrossing => Vec3::new(19, 6, 19),
            FortressKind::BridgeStraight => Vec3::new(5, 4, 19),
            FortressKind::RoomCrossing => Vec3::new(7, 9, 7),
            FortressKind::Corridor => Vec3::new(5, 7, 5),
            FortressKind::CorridorStairs => Vec3::new(5, 14, 10),
            FortressKind::Throne => Vec3::new(7, 8, 9),
            FortressKind::BridgeEndFiller => Vec3::new(5, 4, 8),
        }
    }

    /// The cell a piece is entered through, in the middle of its back face.
    pub fn entrance(self) -> Vec3<i32> { Vec3::new(self.size().x / 2, 0, 0) }

    pub fn exits(self) -> &'static [Exit] {
        match self {
            FortressKind::Start | FortressKind::BridgeCrossing => &CROSSING_EXITS,
            FortressKind::RoomCrossing => &ROOM_EXITS,
            FortressKind::BridgeStraight => &STRAIGHT_EXITS,
            FortressKind::Corridor => &CORRIDOR_EXITS,
            FortressKind::CorridorStairs => &STAIRS_EXITS,
            FortressKind::Throne | FortressKind::BridgeEndFiller => &[],
        }
    }

    /// Enclosed pieces, which lead on to more enclosed pieces.
    pub fn is_castle(self) -> bool {
        matches!(
            self,
            FortressKind::RoomCrossing | FortressKind::Corridor | FortressKind::CorridorStairs
        )
    }
}

struct PieceWeight {
    kind: FortressKind,
    weight: u32,
    /// Zero for no limit.
    max: u32,
    allow_in_row: bool,
}

const fn weight(kind: FortressKind, weight: u32, max: u32, allow_in_row: bool) -> PieceWeight {
    PieceWeight {
        kind,
        weight,
        max,
        allow_in_row,
    }
}

const BRIDGE_PIECES: [PieceWeight; 4] = [
    weight(FortressKind::BridgeStraight, 30, 0, true),
    weight(FortressKind::BridgeCrossing, 10, 4, false),
    weight(FortressKind::RoomCrossing, 10, 4, false),
    weight(FortressKind::Throne, 5, 2, false),
];

const CASTLE_PIECES: [PieceWeight; 4] = [
    weight(FortressKind::Corridor, 25, 0, true),
    weight(FortressKind::CorridorStairs, 10, 3, false),
    weight(FortressKind::RoomCrossing, 10, 4, false),
    weight(FortressKind::Throne, 5, 2, false),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortressPiece {
    pub kind: FortressKind,
}

impl FortressPiece {
    pub fn new(kind: FortressKind) -> Self { Self { kind } }

    pub fn render(
        &self,
        painter: &mut Painter,
        state: &mut PieceState,
        supplement: &mut ChunkSupplement,
        seed: u32,
    ) {
        let brick = Block::of(BlockKind::Brick);
        let fence = Block::of(BlockKind::Fence);
        let max = self.kind.size() - 1;
        let field = RandomField::new(seed);

        match self.kind {
            FortressKind::Start | FortressKind::BridgeCrossing => {
                painter.fill_box(Vec3::new(7, 0, 0), Vec3::new(11, 0, max.z), brick, brick, false);
                painter.fill_box(Vec3::new(0, 0, 7), Vec3::new(max.x, 0, 11), brick, brick, false);
                painter.fill_air(Vec3::new(7, 1, 0), Vec3::new(11, max.y, max.z));
                painter.fill_air(Vec3::new(0, 1, 7), Vec3::new(max.x, max.y, 11));
                // Railings along the arms, open where the arms meet
                for (a, b) in [(0, 6), (12, max.z)] {
                    painter.fill_box(Vec3::new(7, 1, a), Vec3::new(7, 1, b), fence, fence, false);
                    painter.fill_box(Vec3::new(11, 1, a), Vec3::new(11, 1, b), fence, fence, false);
                    painter.fill_box(Vec3::new(a, 1, 7), Vec3::new(b, 1, 7), fence, fence, false);
                    painter.fill_box(Vec3::new(a, 1, 11), Vec3::new(b, 1, 11), fence, fence, false);
                }
                painter.fill_box(Vec3::new(7, 1, 7), Vec3::new(11, max.y, 11), brick, Block::empty(), false);
                painter.fill_air(Vec3::new(8, 1, 7), Vec3::new(10, 3, 11));
                painter.fill_air(Vec3::new(7, 1, 8), Vec3::new(11, 3, 10));
                for x in 7..=11 {
                    for z in 7..=11 {
                        painter.fill_column_down(brick, Vec3::new(x, -1, z));
                    }
                }
            },
            FortressKind::BridgeStraight => {
                painter.fill_box(Vec3::zero(), Vec3::new(max.x, 0, max.z), brick, brick, false);
                painter.fill_air(Vec3::new(0, 1, 0), max);
                painter.fill_box(Vec3::new(0, 1, 0), Vec3::new(0, 1, max.z), fence, fence, false);
                painter.fill_box(Vec3::new(max.x, 1, 0), Vec3::new(max.x, 1, max.z), fence, fence, false);
                painter.fill_random(
                    Vec3::zero(),
                    Vec3::new(max.x, 0, max.z),
                    &field,
                    0.1,
                    Block::of(BlockKind::CrackedBrick),
                );
                for z in [4, 14] {
                    for x in 1..max.x {
                        painter.fill_column_down(brick, Vec3::new(x, -1, z));
                    }
                }
            },
            FortressKind::RoomCrossing => {
                painter.fill_box(Vec3::zero(), max, brick, Block::empty(), false);
                painter.fill_air(Vec3::new(2, 1, 0), Vec3::new(4, 3, 0));
                painter.fill_air(Vec3::new(2, 1, max.z), Vec3::new(4, 3, max.z));
                painter.fill_air(Vec3::new(0, 1, 2), Vec3::new(0, 3, 4));
                painter.fill_air(Vec3::new(max.x, 1, 2), Vec3::new(max.x, 3, 4));
                painter.fill_box(Vec3::new(1, 5, 0), Vec3::new(max.x - 1, 5, 0), fence, fence, false);
                for (x, z) in [(0, 0), (max.x, 0), (0, max.z), (max.x, max.z)] {
                    painter.fill_column_down(brick, Vec3::new(x, -1, z));
                }
            },
            FortressKind::Corridor => {
                painter.fill_box(Vec3::zero(), max, brick, Block::empty(), false);
                painter.fill_air(Vec3::new(1, 1, 0), Vec3::new(max.x - 1, max.y - 1, 0));
                painter.fill_air(Vec3::new(1, 1, max.z), Vec3::new(max.x - 1, max.y - 1, max.z));
                painter.place_block(fence, Vec3::new(0, 3, 2));
                painter.place_block(fence, Vec3::new(max.x, 3, 2));
                for x in [0, max.x] {
                    painter.fill_column_down(brick, Vec3::new(x, -1, 2));
                }
                if state.needs_chest {
                    let pos = painter.world_pos(Vec3::new(max.x - 1, 1, 2));
                    if painter.set_block(pos, Block::of(BlockKind::Chest)) {
                        let loot_seed = PositionalRng::derive(seed, pos).gen::<u64>();
                        supplement.add_loot(pos, CHEST_LOOT, loot_seed);
                        state.needs_chest = false;
                    }
                }
            },
            FortressKind::CorridorStairs => {
                painter.fill_box(Vec3::zero(), max, brick, Block::empty(), false);
                painter.fill_air(Vec3::new(1, 1, 0), Vec3::new(max.x - 1, 4, 0));
                painter.fill_air(Vec3::new(1, 8, max.z), Vec3::new(max.x - 1, max.y - 1, max.z));
                for z in 0..=max.z {
                    let step = (z - 1).clamp(0, 7);
                    painter.fill_box(Vec3::new(1, 0, z), Vec3::new(max.x - 1, step, z), brick, brick, false);
                    if step < 7 {
                        for x in 1..max.x {
                            painter.place_block(Block::of(BlockKind::Stairs), Vec3::new(x, step + 1, z));
                        }
                    }
                }
                for x in [0, max.x] {
                    painter.fill_column_down(brick, Vec3::new(x, -1, 0));
                }
            },
            FortressKind::Throne => {
                painter.fill_box(Vec3::zero(), Vec3::new(max.x, 0, max.z), brick, brick, false);
                painter.fill_air(Vec3::new(0, 1, 0), max);
                painter.fill_box(Vec3::new(0, 1, max.z), Vec3::new(max.x, max.y, max.z), brick, brick, false);
                painter.fill_box(Vec3::new(0, 1, 1), Vec3::new(0, 2, max.z - 1), fence, fence, false);
                painter.fill_box(Vec3::new(max.x, 1, 1), Vec3::new(max.x, 2, max.z - 1), fence, fence, false);
                painter.fill_box(Vec3::new(2, 1, max.z - 2), Vec3::new(4, 1, max.z - 1), brick, brick, false);
                for (x, z) in [(0, 0), (max.x, 0), (0, max.z), (max.x, max.z)] {
                    painter.fill_column_down(brick, Vec3::new(x, -1, z));
                }
                if state.needs_spawner {
                    let pos = painter.world_pos(Vec3::new(3, 2, max.z - 2));
                    if painter.set_block(pos, Block::of(BlockKind::Spawner)) {
                        supplement.add_entity(EntityInfo::at_block(pos, EntityKind::Spawner).into_persistent());
                        state.needs_spawner = false;
                    }
                }
            },
            FortressKind::BridgeEndFiller => {
                // A bridge that broke off, each lane at its own length
                let mut rng = PositionalRng::derive(seed, painter.world_pos(Vec3::zero()));
                for x in 0..=max.x {
                    let len = rng.gen_range(2..=max.z);
                    painter.fill_box(Vec3::new(x, 0, 0), Vec3::new(x, 0, len), brick, brick, false);
                    if x == 0 || x == max.x {
                        let rail = rng.gen_range(1..=len);
                        painter.fill_box(Vec3::new(x, 1, 0), Vec3::new(x, 1, rail), fence, fence, false);
                    }
                }
            },
        }
    }
}

/// Per-fortress bookkeeping for the piece picker.
#[derive(Clone, Debug, Default)]
pub struct FortressState {
    pub start: Vec3<i32>,
    pub counts: HashMap<FortressKind, u32>,
    pub previous: Option<FortressKind>,
}

impl FortressState {
    pub fn new(start: Vec3<i32>) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    fn count(&self, kind: FortressKind) -> u32 { self.counts.get(&kind).copied().unwrap_or(0) }

    fn can_place(&self, w: &PieceWeight) -> bool { w.max == 0 || self.count(w.kind) < w.max }
}

/// Continue the fortress through one exit of a piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FortressSection {
    pub exit: Exit,
    /// Whether the piece being left is enclosed.
    pub castle: bool,
}

fn make_piece<R: Rng>(rng: &mut R, kind: FortressKind, door: Vec3<i32>, orient: Orientation) -> Piece {
    let state = PieceState {
        needs_spawner: kind == FortressKind::Throne,
        needs_chest: kind == FortressKind::Corridor && rng.gen_range(0..3) == 0,
        ..PieceState::default()
    };
    Piece::sized(
        PieceKind::Fortress(FortressPiece::new(kind)),
        door - orient.apply(kind.entrance()),
        orient,
        kind.size(),
        state,
    )
}

fn fits(piece: &Piece, placed: &[Piece], parent: &Socket) -> bool {
    placed
        .iter()
        .filter(|other| parent.lineage.is_none() || other.lineage != parent.lineage)
        .all(|other| !other.bounds.intersects(&piece.bounds))
}

impl Section for FortressSection {
    type State = FortressState;

    /// The fortress caps itself with dead ends long before this.
    const MAX_DEPTH: u32 = 64;

    fn generate<R: Rng>(
        &self,
        ctx: &mut GenCtx<'_, R, FortressState>,
        depth: u32,
        parent: Socket,
        _offset: Option<Vec3<i32>>,
        placed: &[Piece],
        out: &mut Batch,
    ) -> Result<bool, Error> {
        let door = parent.attach(self.exit.at);
        let orient = parent.turned(self.exit.turn);
        let settings = &ctx.settings.fortress;
        let from_start = door - ctx.state.start;
        let far = from_start.x.abs().max(from_start.z.abs()) > settings.radius;

        if !far && depth <= settings.depth_limit {
            let weights = if self.castle { &CASTLE_PIECES } else { &BRIDGE_PIECES };
            let available = weights
                .iter()
                .filter(|w| ctx.state.can_place(w))
                .collect::<Vec<_>>();
            let total = available.iter().map(|w| w.weight).sum::<u32>();
            for _ in 0..settings.piece_tries {
                if total == 0 {
                    break;
                }
                let mut roll = ctx.rng.gen_range(0..total) as i32;
                for w in &available {
                    roll -= w.weight as i32;
                    if roll >= 0 {
                        continue;
                    }
                    if ctx.state.previous == Some(w.kind) && !w.allow_in_row {
                        break;
                    }
                    let piece = make_piece(ctx.rng, w.kind, door, orient);
                    if fits(&piece, placed, &parent) {
                        *ctx.state.counts.entry(w.kind).or_insert(0) += 1;
                        ctx.state.previous = Some(w.kind);
                        out.push(piece);
                        return Ok(true);
                    }
                }
            }
        }

        let filler = make_piece(ctx.rng, FortressKind::BridgeEndFiller, door, orient);
        if fits(&filler, placed, &parent) {
            trace!(depth, far, "Capping fortress exit");
            out.push(filler);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// The sections continuing a piece through each of its exits.
pub fn exits(piece: &Piece) -> Vec<FortressSection> {
    match &piece.kind {
        PieceKind::Fortress(p) => p
            .kind
            .exits()
            .iter()
            .map(|exit| FortressSection {
                exit: *exit,
                castle: p.kind.is_castle(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn has_throne(pieces: &[Piece]) -> bool {
    pieces
        .iter()
        .any(|p| matches!(&p.kind, PieceKind::Fortress(f) if f.kind == FortressKind::Throne))
}

/// Lay out a whole fortress, entered at `origin`.
pub fn generate<R: Rng>(
    ctx: &mut GenCtx<'_, R, FortressState>,
    origin: Vec3<i32>,
    rotation: Rotation,
) -> Result<Vec<Piece>, Error> {
    ctx.state = FortressState::new(origin);
    let lineage = ctx.root_lineage();
    let mut start = make_piece(ctx.rng, FortressKind::Start, origin, Orientation::rotation(rotation));
    start.lineage = Some(lineage);
    let mut pieces = vec![start];
    expand_breadth_first(ctx, &mut pieces, vec![0], exits)?;
    Ok(pieces)
}
