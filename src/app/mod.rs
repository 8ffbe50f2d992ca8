//! Application module
//!
//! Contains the playback-and-capture loop and its state.

pub mod session;
pub mod state;
