use common::{
    terrain::{Block, BlockKind, TemplateManager},
    vol::SparseLevel,
};
use piecegen_world::site::builtin_templates;
use tracing_subscriber::EnvFilter;

/// Install a subscriber printing through the test harness. Only the first
/// call of a test binary has any effect.
pub fn setup(tracing: bool) -> TemplateManager {
    if tracing {
        let filter = EnvFilter::from_default_env()
            .add_directive("piecegen_world=trace".parse().unwrap());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
    builtin_templates()
}

pub fn land(height: i32) -> SparseLevel { SparseLevel::flat(Block::of(BlockKind::Rock), height, Block::empty()) }

pub fn ocean(floor: i32) -> SparseLevel { SparseLevel::flat(Block::of(BlockKind::Sand), floor, Block::water()) }
