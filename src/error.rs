//! Error types for sindef.
//!
//! Core modules return `SindefError` so callers (and tests) can match on the
//! failure kind. The CLI layer wraps these in `anyhow` for reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sindef core operations.
pub type Result<T> = std::result::Result<T, SindefError>;

#[derive(Error, Debug)]
pub enum SindefError {
    /// `--bootstrap` is the one required option for recipe generation.
    #[error(
        "a bootstrap directive is required\n\n\
         Must be one of:\n\
         \x20 --bootstrap localimage:/path/to/image\n\
         \x20 --bootstrap shub:<image>[:<tag>]\n\
         \x20 --bootstrap docker:<image>[:<tag>]"
    )]
    MissingBootstrapOption,

    #[error("invalid format for {what}: {value:?}")]
    InvalidFormat { what: &'static str, value: String },

    #[error("bootstrap image not found: {}", .path.display())]
    BootstrapImageNotFound { path: PathBuf },

    #[error("invalid extension {:?} for bootstrap image {}, must be .img or .simg", .ext, .path.display())]
    InvalidImage { path: PathBuf, ext: String },

    #[error("repository {url} is not reachable: {reason}")]
    UnreachableRepo { url: String, reason: String },

    #[error("invalid output directory {}: must be an existing directory", .path.display())]
    InvalidTargetDirectory { path: PathBuf },

    #[error("image already exists at {}, refusing to overwrite", .path.display())]
    ArtifactExists { path: PathBuf },

    #[error("singularity not found on PATH")]
    ToolNotFound,

    #[error("singularity {found} is too old, version {min} or newer is required")]
    ToolTooOld { found: String, min: &'static str },

    #[error("cannot parse singularity version from {raw:?}")]
    UnparseableVersion { raw: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
