//! craftmap
//!
//! A postprocessor for KISSlicer GCODE output, for viewing in CraftWare.
//!
//! This library provides:
//! - Path-type classification (KISSlicer comment label to CraftWare tag)
//! - A single-pass line transducer with atomic in-place file replacement
//! - Feedrate normalization for short segments ("bang removal")
//! - Configuration management

pub mod classify;
pub mod config;
pub mod normalize;
pub mod process;

// Re-exports for clean public API
pub use classify::{PATH_TYPES, PathTypeEntry, segment_type};
pub use config::{Args, Config};
pub use normalize::FeedrateNormalizer;
pub use process::{Stats, process_file, transform};
