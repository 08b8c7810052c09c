use serde::{Deserialize, Serialize};
use vek::*;

/// Kinds of entity that structures ask to have spawned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Sentry,
    Drowned,
    /// An item frame holding a rare item.
    ItemFrame,
    /// A spawner block entity.
    Spawner,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub pos: Vec3<f32>,
    pub kind: EntityKind,
    /// Persistent entities are not despawned when far away.
    pub persistent: bool,
}

impl EntityInfo {
    pub fn at(pos: Vec3<f32>, kind: EntityKind) -> Self {
        Self {
            pos,
            kind,
            persistent: false,
        }
    }

    /// Centered on top of a voxel.
    pub fn at_block(pos: Vec3<i32>, kind: EntityKind) -> Self {
        Self::at(pos.map(|e| e as f32) + Vec3::new(0.5, 0.0, 0.5), kind)
    }

    #[must_use]
    pub fn into_persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootInfo {
    pub pos: Vec3<i32>,
    pub table: String,
    pub seed: u64,
}

/// Things a structure wants done to a chunk that are not voxels: entities to
/// spawn and containers to fill.
#[derive(Clone, Debug, Default)]
pub struct ChunkSupplement {
    pub entities: Vec<EntityInfo>,
    pub loot: Vec<LootInfo>,
}

impl ChunkSupplement {
    pub fn add_entity(&mut self, entity: EntityInfo) { self.entities.push(entity); }

    pub fn add_loot(&mut self, pos: Vec3<i32>, table: impl Into<String>, seed: u64) {
        self.loot.push(LootInfo {
            pos,
            table: table.into(),
            seed,
        });
    }

    pub fn is_empty(&self) -> bool { self.entities.is_empty() && self.loot.is_empty() }
}
