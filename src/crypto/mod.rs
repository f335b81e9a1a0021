//! Randomness, hashing and constant-time primitives.

pub mod compare;
pub mod digest;
pub mod token;
