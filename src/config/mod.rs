//! Configuration module
//!
//! Contains the capture settings and key matching.

mod capture_config;

pub use capture_config::*;
