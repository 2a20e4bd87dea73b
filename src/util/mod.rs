//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`glob`] - Segment-wise glob matching with recursive `**`

pub mod glob;
