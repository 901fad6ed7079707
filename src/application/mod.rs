//! Application services: the interactive post browser and feed generation.

pub mod browser;
pub mod error;
pub mod sources;
pub mod syndication;
