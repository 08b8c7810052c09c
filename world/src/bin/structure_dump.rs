use clap::Parser;
use common::{
    generation::ChunkSupplement,
    terrain::{Block, BlockKind},
    vol::SparseLevel,
    BoundingBox, Rotation,
};
use piecegen_world::{site::builtin_templates, Assembler, GenSettings, StructureKind};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use vek::*;

/// Assemble one structure on flat ground and print its piece records.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[arg(value_enum)]
    kind: StructureKind,
    #[arg(long, default_value_t = 0)]
    seed: u32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    x: i32,
    #[arg(long, default_value_t = 64, allow_hyphen_values = true)]
    y: i32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    z: i32,
    /// Quarter turns clockwise.
    #[arg(long, default_value_t = 0)]
    turns: u8,
    /// Height of the flat ground. Ruins get a flooded world, so this defaults
    /// to well below sea level for them.
    #[arg(long, allow_hyphen_values = true)]
    ground: Option<i32>,
    /// RON settings file, created with the defaults if missing.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Directory of RON templates, replacing built in ones of the same name.
    #[arg(long)]
    templates: Option<PathBuf>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = cli
        .settings
        .as_deref()
        .map(GenSettings::load)
        .unwrap_or_default();

    let mut level = match cli.kind {
        StructureKind::Ruin => SparseLevel::flat(
            Block::of(BlockKind::Sand),
            cli.ground.unwrap_or(settings.sea_level - 20),
            Block::water(),
        ),
        _ => SparseLevel::flat(Block::of(BlockKind::Rock), cli.ground.unwrap_or(64), Block::empty()),
    };

    let mut templates = builtin_templates();
    if let Some(dir) = &cli.templates {
        match templates.load_dir(dir) {
            Ok(loaded) => info!(loaded, ?dir, "Loaded templates"),
            Err(e) => {
                error!(%e, ?dir, "Failed to read template directory");
                return ExitCode::FAILURE;
            },
        }
    }
    let assembler = Assembler::new(&templates, settings);
    let origin = Vec3::new(cli.x, cli.y, cli.z);
    let rotation = Rotation::from_turns(cli.turns);
    let mut assembly = match assembler.assemble(cli.kind, cli.seed, origin, rotation, &level) {
        Ok(assembly) => assembly,
        Err(e) => {
            error!(%e, "Failed to assemble structure");
            return ExitCode::FAILURE;
        },
    };

    match ron::ser::to_string_pretty(&assembly.records(), ron::ser::PrettyConfig::default()) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            error!(?e, "Failed to serialize piece records");
            return ExitCode::FAILURE;
        },
    }

    let mut supplement = ChunkSupplement::default();
    if let Err(e) = assembly.materialize(&mut level, BoundingBox::infinite(), &templates, &mut supplement) {
        error!(%e, "Failed to materialize structure");
        return ExitCode::FAILURE;
    }
    info!(
        pieces = assembly.pieces.len(),
        attempts = assembly.attempts,
        overlaps = assembly.overlaps().count(),
        writes = level.writes(),
        entities = supplement.entities.len(),
        loot = supplement.loot.len(),
        bounds = ?assembly.bounds(),
        "Materialized structure"
    );
    ExitCode::SUCCESS
}
