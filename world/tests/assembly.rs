mod helper;

use common::{
    generation::{ChunkSupplement, EntityKind},
    terrain::{Block, BlockKind},
    vol::SparseLevel,
    BoundingBox, Rotation,
};
use hashbrown::HashMap;
use helper::{land, ocean};
use piecegen_world::{
    assemble::retry_until_valid,
    site::fortress::{self, FortressKind},
    Assembler, Error, GenSettings, Piece, PieceKind, PieceRecord, StructureKind,
};
use vek::*;

fn origin() -> Vec3<i32> { Vec3::new(0, 64, 0) }

#[test]
fn end_city_from_seed_42() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    let city = assembler
        .assemble(StructureKind::EndCity, 42, origin(), Rotation::None, &land(64))
        .unwrap();

    assert!(!city.pieces.is_empty());
    assert_eq!(city.attempts, 1);
    assert!(city.pieces.iter().all(|p| p.lineage.is_some()));
    assert!(city.pieces.iter().all(|p| p.depth <= 8));
    assert_eq!(city.pieces[0].anchor, origin());

    for (a, b) in city.overlaps().filter(|(a, b)| a.lineage != b.lineage) {
        assert!(city.is_related(a, b), "{:?} and {:?} overlap", a.bounds, b.bounds);
    }
}

#[test]
fn same_seed_same_structure() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    for kind in [StructureKind::EndCity, StructureKind::Fortress] {
        let level = land(64);
        let a = assembler.assemble(kind, 7, origin(), Rotation::Clockwise90, &level).unwrap();
        let b = assembler.assemble(kind, 7, origin(), Rotation::Clockwise90, &level).unwrap();
        assert_eq!(a.records(), b.records());
    }
    let level = ocean(40);
    let a = assembler.assemble(StructureKind::Ruin, 7, origin(), Rotation::None, &level).unwrap();
    let b = assembler.assemble(StructureKind::Ruin, 7, origin(), Rotation::None, &level).unwrap();
    assert_eq!(a.records(), b.records());
}

#[test]
fn retries_stop_at_the_cap() {
    helper::setup(true);
    let max_attempts = GenSettings::default().max_attempts;
    assert_eq!(max_attempts, 100);
    let mut calls = 0;
    let res = retry_until_valid(
        9,
        max_attempts,
        |seed| {
            calls += 1;
            Ok(seed)
        },
        |_| false,
    );
    assert!(matches!(res, Err(Error::AttemptsExhausted { attempts: 100 })));
    assert_eq!(calls, 100);
}

#[test]
fn fortresses_have_a_throne() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    for seed in 0..4 {
        let mut built = assembler
            .assemble(StructureKind::Fortress, seed, origin(), Rotation::None, &land(64))
            .unwrap();
        assert!(fortress::has_throne(&built.pieces));
        assert!(built.attempts >= 1 && built.attempts <= 100);
        assert_eq!(built.seed, seed + built.attempts - 1);
        assert!(built.bounds().unwrap().min.y >= 48);

        // The spawner is only placed once, however often the throne is written
        let mut level = land(64);
        let mut supplement = ChunkSupplement::default();
        for _ in 0..2 {
            built
                .materialize(&mut level, BoundingBox::infinite(), &templates, &mut supplement)
                .unwrap();
        }
        let thrones = built
            .pieces
            .iter()
            .filter(|p| matches!(&p.kind, PieceKind::Fortress(f) if f.kind == FortressKind::Throne))
            .collect::<Vec<_>>();
        assert!(thrones.iter().all(|p| !p.state.needs_spawner));
        let spawners = supplement
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Spawner)
            .count();
        assert_eq!(spawners, thrones.len());
    }
}

#[test]
fn supports_match_across_column_clips() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    let built = assembler
        .assemble(StructureKind::Fortress, 1, origin(), Rotation::None, &land(20))
        .unwrap();
    let bounds = built.bounds().unwrap();
    let voxels = |level: &SparseLevel| level.written().collect::<HashMap<Vec3<i32>, Block>>();

    let mut whole = land(20);
    built
        .clone()
        .materialize(&mut whole, BoundingBox::infinite(), &templates, &mut ChunkSupplement::default())
        .unwrap();
    // The start piece stands on supports reaching down to the ground
    let written = whole.written_bounds().unwrap();
    assert!(written.min.y < bounds.min.y);
    assert_eq!(written.min.y, 20);

    let mut columns = land(20);
    let mut parts = built.clone();
    for cx in bounds.min.x.div_euclid(16)..=bounds.max.x.div_euclid(16) {
        for cz in bounds.min.z.div_euclid(16)..=bounds.max.z.div_euclid(16) {
            let min = Vec3::new(cx * 16, 0, cz * 16);
            let clip = BoundingBox::from_corners(min, Vec3::new(min.x + 15, bounds.max.y, min.z + 15));
            parts
                .materialize(&mut columns, clip, &templates, &mut ChunkSupplement::default())
                .unwrap();
        }
    }
    assert_eq!(voxels(&columns), voxels(&whole));

    // Clips cut across the height would lose support voxels
    let start = built.pieces[0].bounds.min;
    for min in [Vec3::new(start.x, 32, start.z), Vec3::new(start.x, 0, start.z)] {
        let cube = BoundingBox::from_corners(min, min + Vec3::broadcast(15));
        let res = built
            .clone()
            .materialize(&mut land(20), cube, &templates, &mut ChunkSupplement::default());
        assert!(matches!(res, Err(Error::PartialColumn { .. })), "{:?}", cube);
    }
}

#[test]
fn writes_stay_inside_the_clip() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    let mut city = assembler
        .assemble(StructureKind::EndCity, 3, origin(), Rotation::None, &land(64))
        .unwrap();
    let clip = BoundingBox::from_corners(Vec3::new(0, 0, 0), Vec3::new(15, 255, 15));
    let mut level = land(64);
    let mut supplement = ChunkSupplement::default();
    city.materialize(&mut level, clip, &templates, &mut supplement).unwrap();
    assert!(level.writes() > 0);
    assert!(level.written().all(|(pos, _)| clip.contains(pos)));
    assert!(supplement.loot.iter().all(|l| clip.contains(l.pos)));
}

#[test]
fn ruins_do_not_drain_the_sea() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    for seed in 0..8 {
        let mut ruin = assembler
            .assemble(StructureKind::Ruin, seed, origin(), Rotation::None, &ocean(40))
            .unwrap();
        let mut level = ocean(40);
        let mut supplement = ChunkSupplement::default();
        ruin.materialize(&mut level, BoundingBox::infinite(), &templates, &mut supplement)
            .unwrap();
        assert!(level.writes() > 0);
        assert!(level.written().all(|(_, block)| block.kind() != BlockKind::Air));
    }
}

#[test]
fn records_rebuild_the_structure() {
    let templates = helper::setup(false);
    let assembler = Assembler::new(&templates, GenSettings::default());
    let city = assembler
        .assemble(StructureKind::EndCity, 11, origin(), Rotation::CounterClockwise90, &land(64))
        .unwrap();

    let s = ron::ser::to_string(&city.records()).unwrap();
    let records: Vec<PieceRecord> = ron::de::from_str(&s).unwrap();
    let rebuilt = records
        .into_iter()
        .map(|record| Piece::from_record(record, &templates))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(rebuilt.len(), city.pieces.len());
    for (a, b) in rebuilt.iter().zip(city.pieces.iter()) {
        assert_eq!(a.bounds, b.bounds);
        assert_eq!(a.to_record(), b.to_record());
    }
}
