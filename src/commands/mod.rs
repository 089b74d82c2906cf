//! CLI command handlers.
//!
//! - `generate` - generate a definition file, optionally build the image
//! - `preflight` - check the singularity install before doing any work

pub mod generate;
pub mod preflight;

pub use generate::cmd_generate;
pub use preflight::cmd_preflight;
