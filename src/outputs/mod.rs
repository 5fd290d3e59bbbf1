//! Output generation for stage checkpoints.
//!
//! # Submodules
//!
//! - [`json`]: Writes and reads the per-stage JSON checkpoint files

pub mod json;
