#![deny(unsafe_code)]
#![allow(clippy::option_map_unit_fn)]

pub mod bounds;
pub mod generation;
pub mod ori;
pub mod store;
pub mod terrain;
pub mod util;
pub mod vol;

pub use bounds::BoundingBox;
pub use ori::{Mirror, Orientation, Rotation, Transform};
