//! Transport-facing request types.

pub mod requests;
