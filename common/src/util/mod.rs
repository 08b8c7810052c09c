pub mod random;

// Reexports
pub use self::random::{seeded_rng, PositionalRng, RandomField, Sampler};
