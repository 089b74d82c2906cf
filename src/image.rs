//! Image build driving.
//!
//! Turns a written definition file into a container image by invoking
//! `singularity build` with format-specific flags. Singularity 2.x builds
//! need root, so the invocation goes through `sudo`.

use std::path::{Path, PathBuf};

use crate::config::ImageFormat;
use crate::error::{Result, SindefError};
use crate::process::Cmd;

/// A built (or about to be built) image artifact.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// Artifact file name for a definition file.
///
/// An explicit name wins; otherwise the name is the definition file name
/// after its `Singularity.` prefix (`Singularity.bzip2-1.0.6` builds
/// `bzip2-1.0.6.simg`). The format suffix is always appended; sandbox
/// artifacts are directories and get none.
pub fn artifact_name(
    definition_name: &str,
    explicit_name: Option<&str>,
    format: ImageFormat,
) -> String {
    let base = match explicit_name {
        Some(name) => name.to_string(),
        None => definition_name
            .split_once('.')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| definition_name.to_string()),
    };
    format!("{}{}", base, format.suffix())
}

/// Build the image for a definition file already written into `dir`.
///
/// Refuses to overwrite: fails with `ArtifactExists` when the artifact path
/// is already taken, before the external tool is invoked. The tool's own
/// exit status is surfaced as a warning only; the written definition file
/// stays in place either way so the build can be retried.
pub fn build_image(
    dir: &Path,
    definition_name: &str,
    format: ImageFormat,
    explicit_name: Option<&str>,
) -> Result<ImageArtifact> {
    let name = artifact_name(definition_name, explicit_name, format);
    let path = dir.join(&name);
    if path.exists() {
        return Err(SindefError::ArtifactExists { path });
    }

    let mut cmd = Cmd::new("sudo").arg("singularity").arg("build");
    match format {
        ImageFormat::Squashfs => {}
        ImageFormat::Ext3 => cmd = cmd.arg("--writable"),
        ImageFormat::Sandbox => cmd = cmd.arg("--sandbox"),
    }

    let status = cmd
        .arg(&name)
        .arg(definition_name)
        .dir(dir)
        .allow_fail()
        .run_interactive()?;

    if !status.success() {
        eprintln!(
            "[WARN] singularity build exited with code {} for {}",
            status.code().unwrap_or(-1),
            path.display()
        );
    }

    Ok(ImageArtifact { path, format })
}
