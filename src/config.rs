//! Typed configuration for recipe generation.
//!
//! The CLI builds a [`GenerateConfig`] once, at the boundary, and the core
//! never mutates it. Defaults come from the environment (`.env` is loaded in
//! `main`), matching how the rest of the options are resolved.

use std::env;
use std::path::PathBuf;

use clap::ValueEnum;

/// Image format produced by `singularity build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    /// Compressed read-only image (default).
    Squashfs,
    /// Writable ext3 image.
    Ext3,
    /// Chroot-style directory sandbox.
    Sandbox,
}

impl ImageFormat {
    /// File-name suffix appended to the artifact name. Sandbox images are
    /// directories and carry no suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageFormat::Squashfs => ".simg",
            ImageFormat::Ext3 => ".img",
            ImageFormat::Sandbox => "",
        }
    }
}

/// Module naming scheme used by EasyBuild inside the container.
///
/// The scheme decides both the `module use` path and how many `module load`
/// lines the generated environment section needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModuleScheme {
    /// Flat scheme: one module named `<name>/<version>-<toolchain>-<tcver>`.
    #[default]
    Easybuild,
    /// Hierarchical scheme: toolchain module first, then the package module
    /// under the Core namespace.
    Hierarchical,
}

impl ModuleScheme {
    /// Value passed to `eb --module-naming-scheme=`.
    pub fn flag(self) -> &'static str {
        match self {
            ModuleScheme::Easybuild => "EasyBuildMNS",
            ModuleScheme::Hierarchical => "HierarchicalMNS",
        }
    }

    /// Module tree root inside the container.
    pub fn module_path(self) -> &'static str {
        match self {
            ModuleScheme::Easybuild => "/app/modules/all/",
            ModuleScheme::Hierarchical => "/app/modules/all/Core",
        }
    }
}

/// Options for the `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Raw bootstrap directive (`localimage:...`, `shub:...`, `docker:...`).
    /// Required; kept optional here so its absence is reported as a proper
    /// error rather than by the argument parser.
    pub bootstrap: Option<String>,
    /// Easyconfig repository reference (`<host>:<path>:<branch>`).
    pub easyconfig_repo: Option<String>,
    /// Easyblock repository reference (`<host>:<path>:<branch>:<file>`).
    pub easyblock_repo: Option<String>,
    /// Explicit image name; derived from the definition file name if unset.
    pub image_name: Option<String>,
    pub image_format: ImageFormat,
    /// Build the image after writing the definition file.
    pub build_image: bool,
    pub module_scheme: ModuleScheme,
    /// Directory the definition file (and image) are written to.
    pub output_dir: PathBuf,
}

/// Default output directory: `SINDEF_OUTPUT_DIR`, or the current directory.
pub fn default_output_dir() -> PathBuf {
    env::var("SINDEF_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
