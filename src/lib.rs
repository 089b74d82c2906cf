//! Sindef - Singularity definition file generator for EasyBuild builds.
//!
//! Turns a resolved build request (ordered list of package build specs) into
//! a Singularity definition file, and optionally drives `singularity build`
//! to materialize the container image.

pub mod bootstrap;
pub mod buildspec;
pub mod commands;
pub mod config;
pub mod error;
pub mod image;
pub mod preflight;
pub mod process;
pub mod recipe;
pub mod repo;
