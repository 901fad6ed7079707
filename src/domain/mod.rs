//! Domain layer: post records, filter state and their invariants.

pub mod error;
pub mod filter;
pub mod posts;
pub mod query;
