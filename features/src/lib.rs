//! Feature detection
//!
//! Shi-Tomasi corner detection used to seed the frame-to-frame tracker.

pub mod gftt;

pub use gftt::*;
