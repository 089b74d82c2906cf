//! Bootstrap directive parsing and validation.
//!
//! The directive describes where the container's base layer comes from:
//!
//! ```text
//! localimage:/path/to/base.simg
//! shub:<image>[:<tag>]
//! docker:<image>[:<tag>]
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Result, SindefError};

/// Legacy tag value meaning "untagged"; accepted on input for compatibility.
const UNTAGGED: &str = "NONE";

/// Parsed bootstrap directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Base layer from an image file on the local filesystem.
    LocalImage { path: PathBuf },
    /// Base layer pulled from Singularity Hub.
    Shub { image: String, tag: Option<String> },
    /// Base layer pulled from a Docker registry.
    Docker { image: String, tag: Option<String> },
}

impl Bootstrap {
    /// Parse a raw directive string.
    ///
    /// The string must split into 2 or 3 colon-separated fields with a known
    /// agent in field 0. `localimage` takes exactly one argument (the path);
    /// `shub`/`docker` take an image name and an optional tag.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || SindefError::InvalidFormat {
            what: "--bootstrap",
            value: raw.to_string(),
        };

        let fields: Vec<&str> = raw.split(':').collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(invalid());
        }

        match fields[0] {
            "localimage" => {
                if fields.len() != 2 {
                    return Err(invalid());
                }
                Ok(Bootstrap::LocalImage {
                    path: PathBuf::from(fields[1]),
                })
            }
            "shub" => Ok(Bootstrap::Shub {
                image: fields[1].to_string(),
                tag: parse_tag(&fields),
            }),
            "docker" => Ok(Bootstrap::Docker {
                image: fields[1].to_string(),
                tag: parse_tag(&fields),
            }),
            _ => Err(invalid()),
        }
    }

    /// Parse the directive, treating a missing option as a hard error.
    ///
    /// The bootstrap directive is the one required option for recipe
    /// generation.
    pub fn parse_option(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Err(SindefError::MissingBootstrapOption),
        }
    }

    /// Validate filesystem preconditions.
    ///
    /// A local image must exist and carry a `.img` or `.simg` extension.
    /// Remote references (`shub`/`docker`) are opaque and not checked.
    pub fn validate(&self) -> Result<()> {
        match self {
            Bootstrap::LocalImage { path } => validate_local_image(path),
            Bootstrap::Shub { .. } | Bootstrap::Docker { .. } => Ok(()),
        }
    }
}

fn parse_tag(fields: &[&str]) -> Option<String> {
    fields
        .get(2)
        .copied()
        .filter(|&tag| tag != UNTAGGED)
        .map(str::to_string)
}

fn validate_local_image(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SindefError::BootstrapImageNotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    if ext == "img" || ext == "simg" {
        Ok(())
    } else {
        Err(SindefError::InvalidImage {
            path: path.to_path_buf(),
            ext,
        })
    }
}
