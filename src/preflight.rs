//! Preflight check for the singularity tool.
//!
//! Runs before any definition file is written or image is built: the tool
//! must be on PATH and at least version 2.4 (older releases lack the build
//! formats this crate drives).

use std::fmt;
use std::path::PathBuf;

use crate::error::{Result, SindefError};
use crate::process::Cmd;

/// Name of the external build tool on PATH.
pub const SINGULARITY: &str = "singularity";

/// Minimum supported singularity version.
pub const MIN_VERSION: Version = Version {
    major: 2,
    minor: 4,
    patch: 0,
};

/// Numeric tool version. Distribution tags (`2.4-dist`) are stripped before
/// parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Parse the numeric portion of a reported version string.
    ///
    /// Accepts `2.4`, `2.4.1`, and dash-suffixed forms like `2.4-dist`;
    /// missing minor/patch components default to zero.
    pub fn parse(raw: &str) -> Result<Self> {
        let unparseable = || SindefError::UnparseableVersion {
            raw: raw.to_string(),
        };

        let numeric = raw.trim().split('-').next().unwrap_or("");
        let mut parts = numeric.split('.');

        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unparseable)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| unparseable())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| unparseable())?,
            None => 0,
        };

        Ok(Version {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Capability seam for obtaining the tool's version string, so the check is
/// testable without a singularity install.
pub trait VersionProbe {
    /// Raw version string as reported by the tool.
    fn version(&self) -> Result<String>;
}

/// Real probe: runs `singularity --version` and captures stdout.
pub struct SingularityCli;

impl VersionProbe for SingularityCli {
    fn version(&self) -> Result<String> {
        let result = Cmd::new(SINGULARITY).arg("--version").run()?;
        Ok(result.stdout_trimmed().to_string())
    }
}

/// Locate `tool` on PATH.
pub fn locate(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|_| SindefError::ToolNotFound)
}

/// Parse the probed version and enforce the minimum.
pub fn check_version(probe: &dyn VersionProbe) -> Result<Version> {
    let raw = probe.version()?;
    let version = Version::parse(&raw)?;
    if version < MIN_VERSION {
        return Err(SindefError::ToolTooOld {
            found: raw.trim().to_string(),
            min: "2.4",
        });
    }
    Ok(version)
}

/// Full preflight: tool present and recent enough.
pub fn check(probe: &dyn VersionProbe) -> Result<Version> {
    locate(SINGULARITY)?;
    check_version(probe)
}
