use hashbrown::HashMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, ops::Deref};
use strum::{EnumIter, IntoEnumIterator};

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, EnumIter)]
#[repr(u8)]
pub enum BlockKind {
    Air = 0x00, // Air counts as a fluid
    Water = 0x01,
    Lava = 0x02,
    // 0x03 <= x < 0x10 are reserved for other fluids. `is_fluid` is just
    // `block_kind & 0xF0 == 0`.
    Rock = 0x10,
    WeakRock = 0x11,
    Bedrock = 0x12,
    Grass = 0x20,
    Earth = 0x30,
    Sand = 0x31,
    Gravel = 0x32,
    Wood = 0x40,
    // Building materials
    Brick = 0x50,
    CrackedBrick = 0x51,
    Purpur = 0x52,
    Pillar = 0x53,
    Glass = 0x54,
    Fence = 0x55,
    Stairs = 0x56,
    Lantern = 0x57,
    // Containers and other blocks that need a follow-up in the supplement
    Chest = 0x60,
    Spawner = 0x61,
    Misc = 0xFE,
}

impl BlockKind {
    #[inline]
    pub const fn is_air(&self) -> bool { matches!(self, BlockKind::Air) }

    /// Determine whether the block kind is a gas or a liquid.
    #[inline]
    pub const fn is_fluid(&self) -> bool { *self as u8 & 0xF0 == 0x00 }

    #[inline]
    pub const fn is_liquid(&self) -> bool { self.is_fluid() && !self.is_air() }

    /// Determine whether the block is filled (i.e: fully solid). Right now,
    /// this is the opposite of being a fluid.
    #[inline]
    pub const fn is_filled(&self) -> bool { !self.is_fluid() }

    /// Blocks that a structure may not carve through.
    #[inline]
    pub const fn is_indestructible(&self) -> bool { matches!(self, BlockKind::Bedrock) }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{:?}", self) }
}

lazy_static! {
    pub static ref BLOCK_KINDS: HashMap<String, BlockKind> = BlockKind::iter()
        .map(|bk| (bk.to_string(), bk))
        .collect();
}

impl<'a> TryFrom<&'a str> for BlockKind {
    type Error = ();

    fn try_from(s: &'a str) -> Result<Self, Self::Error> { BLOCK_KINDS.get(s).copied().ok_or(()) }
}

/// A voxel. Blocks carry no colour; `attr[0]` holds the orientation of
/// directional blocks and the other bytes are reserved.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Block {
    kind: BlockKind,
    attr: [u8; 3],
}

impl Deref for Block {
    type Target = BlockKind;

    fn deref(&self) -> &Self::Target { &self.kind }
}

impl Default for Block {
    fn default() -> Self { Self::empty() }
}

impl Block {
    #[inline]
    pub const fn of(kind: BlockKind) -> Self {
        Self {
            kind,
            attr: [0; 3],
        }
    }

    #[inline]
    pub const fn empty() -> Self { Self::of(BlockKind::Air) }

    #[inline]
    pub const fn water() -> Self { Self::of(BlockKind::Water) }

    #[inline]
    pub const fn kind(&self) -> BlockKind { self.kind }

    /// Orientation, stored for directional blocks such as stairs.
    #[inline]
    pub fn get_ori(&self) -> u8 { self.attr[0] & 0b11 }

    #[inline]
    #[must_use]
    pub fn with_ori(mut self, ori: u8) -> Self {
        self.attr[0] = (self.attr[0] & !0b11) | (ori & 0b11);
        self
    }
}

/// Fluid occupying a voxel, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fluid {
    Water,
    Lava,
}

impl Fluid {
    pub fn from_block(block: Block) -> Option<Self> {
        match block.kind() {
            BlockKind::Water => Some(Fluid::Water),
            BlockKind::Lava => Some(Fluid::Lava),
            _ => None,
        }
    }
}
