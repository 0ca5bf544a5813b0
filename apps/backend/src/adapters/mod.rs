//! Adapters for external dependencies.

pub mod wardrobe_sea;
