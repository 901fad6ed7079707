//! Presentation layer: view models rendered for the terminal.

pub mod views;
