//! Utility helpers

pub mod color;
