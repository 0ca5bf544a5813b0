//! Use cases on top of the repositories.

pub mod wardrobe;
