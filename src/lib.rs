//! Post browser and RSS generator for a static blog driven by a JSON snapshot
//! of post metadata.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
