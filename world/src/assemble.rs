//! Turning a seed and a location into a finished structure.

use crate::{
    config::GenSettings,
    piece::{Piece, PieceRecord},
    section::{descends_from, GenCtx, GenStats, Lineage},
    site::{
        end_city::{self, EndCityState},
        fortress::{self, FortressState},
        ruin,
    },
    Error,
};
use common::{
    generation::ChunkSupplement,
    ori::Rotation,
    store::Store,
    terrain::TemplateSource,
    util::seeded_rng,
    vol::{HeightKind, ReadLevel, WriteLevel},
    BoundingBox,
};
use itertools::Itertools;
use rand::Rng;
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vek::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "bin_dump", derive(clap::ValueEnum))]
pub enum StructureKind {
    EndCity,
    Fortress,
    Ruin,
}

/// Where a finished structure is moved to, vertically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalPlacement {
    #[default]
    Unchanged,
    /// Rest the bottom of the structure at a random height so that the whole
    /// structure stays within `min..=max`.
    InsideHeights { min: i32, max: i32 },
    /// Sink the structure so that its top ends up at least `margin` below
    /// the sea, but no lower than `min_y`.
    BelowSeaLevel { sea_level: i32, min_y: i32, margin: i32 },
}

impl VerticalPlacement {
    /// Vertical shift to apply to a structure covering `bounds`.
    pub fn offset(&self, bounds: &BoundingBox, rng: &mut impl Rng) -> i32 {
        match *self {
            VerticalPlacement::Unchanged => 0,
            VerticalPlacement::InsideHeights { min, max } => {
                let room = max - min + 1 - bounds.size().y;
                let base = if room > 1 { min + rng.gen_range(0..room) } else { min };
                base - bounds.min.y
            },
            VerticalPlacement::BelowSeaLevel {
                sea_level,
                min_y,
                margin,
            } => {
                let limit = sea_level - margin;
                let mut top = bounds.size().y + min_y + 1;
                if top < limit {
                    top += rng.gen_range(0..limit - top);
                }
                top - bounds.max.y
            },
        }
    }
}

/// The box around every piece, if there are any.
pub fn structure_bounds(pieces: &[Piece]) -> Option<BoundingBox> {
    pieces
        .iter()
        .map(|p| p.bounds)
        .reduce(|a, b| a.union(&b))
}

/// Move every piece by the same vertical offset. Returns the offset.
pub fn adjust_vertically(pieces: &mut [Piece], placement: &VerticalPlacement, rng: &mut impl Rng) -> i32 {
    let dy = match structure_bounds(pieces) {
        Some(bounds) => placement.offset(&bounds, rng),
        None => return 0,
    };
    if dy != 0 {
        pieces.iter_mut().for_each(|p| p.translate(Vec3::unit_y() * dy));
    }
    dy
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FloorRule {
    /// Air directly above a solid voxel.
    AirAboveSolid,
    /// Liquid directly above a solid voxel, such as the sea floor.
    FluidAboveSolid,
}

/// Scan the column downwards from `start_y` to `min_y` (both inclusive) for
/// the first voxel matching `rule`.
pub fn find_floor(
    level: &dyn ReadLevel,
    col: Vec2<i32>,
    start_y: i32,
    min_y: i32,
    rule: FloorRule,
) -> Option<i32> {
    (min_y..=start_y).rev().find(|y| {
        let pos = Vec3::new(col.x, *y, col.y);
        let here = level.get(pos);
        let open = match rule {
            FloorRule::AirAboveSolid => here.is_air(),
            FloorRule::FluidAboveSolid => here.is_liquid(),
        };
        open && level.get(pos - Vec3::unit_y()).is_filled()
    })
}

/// Regenerate from scratch until `accept` is happy with the result. Attempt
/// `n` runs with seed `seed + n`. Returns the accepted result and the number
/// of attempts it took.
pub fn retry_until_valid<T>(
    seed: u32,
    max_attempts: u32,
    mut attempt: impl FnMut(u32) -> Result<T, Error>,
    accept: impl Fn(&T) -> bool,
) -> Result<(T, u32), Error> {
    for n in 0..max_attempts {
        let res = attempt(seed.wrapping_add(n))?;
        if accept(&res) {
            debug!(attempts = n + 1, "Found a valid structure");
            return Ok((res, n + 1));
        }
    }
    warn!(attempts = max_attempts, seed, "Giving up on structure, no attempt was valid");
    Err(Error::AttemptsExhausted {
        attempts: max_attempts,
    })
}

/// A generated structure, ready to be written into the world.
#[derive(Clone, Debug)]
pub struct Assembly {
    pub kind: StructureKind,
    /// Seed of the attempt that produced the pieces.
    pub seed: u32,
    pub pieces: Vec<Piece>,
    pub lineages: Store<Lineage>,
    pub stats: GenStats,
    pub attempts: u32,
}

impl Assembly {
    pub fn bounds(&self) -> Option<BoundingBox> { structure_bounds(&self.pieces) }

    pub fn records(&self) -> Vec<PieceRecord> { self.pieces.iter().map(Piece::to_record).collect() }

    /// Every pair of pieces whose bounds intersect.
    pub fn overlaps(&self) -> impl Iterator<Item = (&Piece, &Piece)> + '_ {
        self.pieces
            .iter()
            .tuple_combinations()
            .filter(|(a, b)| a.bounds.intersects(&b.bounds))
    }

    /// Whether one of the pieces grew, directly or not, out of the other.
    pub fn is_related(&self, a: &Piece, b: &Piece) -> bool {
        match (a.lineage, b.lineage) {
            (Some(a), Some(b)) => {
                descends_from(&self.lineages, a, b) || descends_from(&self.lineages, b, a)
            },
            _ => false,
        }
    }

    /// Write the part of the structure inside `clip`.
    pub fn materialize(
        &mut self,
        level: &mut dyn WriteLevel,
        clip: BoundingBox,
        templates: &dyn TemplateSource,
        supplement: &mut ChunkSupplement,
    ) -> Result<(), Error> {
        for piece in self.pieces.iter_mut() {
            piece.materialize(level, clip, templates, supplement, self.seed)?;
        }
        Ok(())
    }
}

/// Generates structures against one set of templates and settings. Holds no
/// per-structure state, so one assembler may serve many threads.
pub struct Assembler<'a> {
    templates: &'a dyn TemplateSource,
    settings: GenSettings,
}

impl<'a> Assembler<'a> {
    pub fn new(templates: &'a dyn TemplateSource, settings: GenSettings) -> Self {
        Self { templates, settings }
    }

    pub fn settings(&self) -> &GenSettings { &self.settings }

    /// Generate one attempt of a structure with fresh state.
    fn attempt<S: Default>(
        &self,
        kind: StructureKind,
        seed: u32,
        generate: impl FnOnce(&mut GenCtx<'_, ChaChaRng, S>) -> Result<Vec<Piece>, Error>,
    ) -> Result<Assembly, Error> {
        let mut rng = seeded_rng(seed);
        let mut ctx = GenCtx::new(&mut rng, self.templates, &self.settings, S::default());
        let pieces = generate(&mut ctx)?;
        Ok(Assembly {
            kind,
            seed,
            pieces,
            lineages: ctx.lineages,
            stats: ctx.stats,
            attempts: 1,
        })
    }

    /// Lowest floor under the corners of the end city footprint.
    fn end_city_floor(&self, level: &dyn ReadLevel, origin: Vec3<i32>, rotation: Rotation) -> Result<i32, Error> {
        let col = Vec2::new(origin.x, origin.z);
        let reach = rotation.rotate_offset(Vec2::broadcast(self.settings.end_city.footprint));
        let min_y = self.settings.min_ground_height;
        [
            col,
            col + Vec2::new(reach.x, 0),
            col + Vec2::new(0, reach.y),
            col + reach,
        ]
        .iter()
        .map(|corner| {
            let start = level.height(*corner, HeightKind::Surface);
            find_floor(level, *corner, start, min_y, FloorRule::AirAboveSolid)
        })
        .try_fold(i32::MAX, |lowest, floor| floor.map(|y| lowest.min(y)))
        .ok_or(Error::NoViableAnchor { pos: col })
    }

    pub fn assemble(
        &self,
        kind: StructureKind,
        seed: u32,
        origin: Vec3<i32>,
        rotation: Rotation,
        level: &dyn ReadLevel,
    ) -> Result<Assembly, Error> {
        let assembly = match kind {
            StructureKind::EndCity => {
                let floor = self.end_city_floor(level, origin, rotation)?;
                let origin = Vec3::new(origin.x, floor, origin.z);
                self.attempt::<EndCityState>(kind, seed, |ctx| end_city::generate(ctx, origin, rotation))?
            },
            StructureKind::Fortress => {
                let placement = &self.settings.fortress.vertical;
                let (mut assembly, attempts) = retry_until_valid(
                    seed,
                    self.settings.max_attempts,
                    |seed| {
                        self.attempt::<FortressState>(kind, seed, |ctx| {
                            let mut pieces = fortress::generate(ctx, origin, rotation)?;
                            adjust_vertically(&mut pieces, placement, ctx.rng);
                            Ok(pieces)
                        })
                    },
                    |assembly| fortress::has_throne(&assembly.pieces),
                )?;
                assembly.attempts = attempts;
                assembly
            },
            StructureKind::Ruin => self.attempt::<()>(kind, seed, |ctx| ruin::generate(ctx, level, origin, rotation))?,
        };
        debug!(
            ?kind,
            seed,
            pieces = assembly.pieces.len(),
            attempts = assembly.attempts,
            deepest = assembly.stats.deepest,
            collisions = assembly.stats.collisions,
            "Assembled structure"
        );
        Ok(assembly)
    }
}
