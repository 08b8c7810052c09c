#![deny(unsafe_code)]
#![allow(clippy::option_map_unit_fn)]

pub mod assemble;
pub mod config;
pub mod piece;
pub mod section;
pub mod site;

// Reexports
pub use crate::{
    assemble::{Assembler, Assembly, StructureKind},
    config::GenSettings,
    piece::{Piece, PieceKind, PieceRecord},
};

use std::fmt;
use vek::*;

#[derive(Debug)]
pub enum Error {
    /// A template the structure needs is not known to the template source.
    MissingTemplate(String),
    /// No floor to rest the structure on was found at this column.
    NoViableAnchor { pos: Vec2<i32> },
    /// Every attempt of a retry-until-valid assembly was rejected.
    AttemptsExhausted { attempts: u32 },
    /// A clip that does not cover whole columns was given to a piece whose
    /// supports reach down to the ground.
    PartialColumn { bottom: i32, top: i32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingTemplate(id) => write!(f, "missing template '{}'", id),
            Error::NoViableAnchor { pos } => {
                write!(f, "no floor to place a structure on at ({}, {})", pos.x, pos.y)
            },
            Error::AttemptsExhausted { attempts } => {
                write!(f, "no valid structure after {} attempts", attempts)
            },
            Error::PartialColumn { bottom, top } => write!(
                f,
                "clip from y = {} to {} does not cover the full height of a supported piece",
                bottom, top
            ),
        }
    }
}

impl std::error::Error for Error {}
