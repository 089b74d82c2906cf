//! Resolved build request data model.
//!
//! The build-spec list is produced upstream (EasyBuild dependency resolution)
//! and consumed here as an opaque ordered sequence, loaded from a JSON
//! document. Only the first spec drives recipe generation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Toolchain a package is built against.
#[derive(Debug, Clone, Deserialize)]
pub struct Toolchain {
    pub name: String,
    pub version: String,
}

impl Toolchain {
    /// True for the "no toolchain" sentinel (`dummy` in older easyconfigs,
    /// `none` in newer ones).
    pub fn is_system(&self) -> bool {
        matches!(self.name.as_str(), "dummy" | "none")
    }
}

/// OS package dependencies, as they appear in easyconfigs.
///
/// Two shapes exist in the wild: a flat list of package names, and a legacy
/// shape wrapping name groups in an outer list. [`OsDependencies::flatten`]
/// normalizes both to one flat sequence at this boundary so the recipe
/// builder never sees the ambiguity.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OsDependencies {
    Flat(Vec<String>),
    Wrapped(Vec<Vec<String>>),
}

impl Default for OsDependencies {
    fn default() -> Self {
        OsDependencies::Flat(Vec::new())
    }
}

impl OsDependencies {
    pub fn flatten(&self) -> Vec<String> {
        match self {
            OsDependencies::Flat(packages) => packages.clone(),
            OsDependencies::Wrapped(groups) => groups.iter().flatten().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OsDependencies::Flat(packages) => packages.is_empty(),
            OsDependencies::Wrapped(groups) => groups.iter().all(|g| g.is_empty()),
        }
    }
}

/// One resolved package build specification.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub versionsuffix: String,
    pub toolchain: Toolchain,
    #[serde(default)]
    pub osdependencies: OsDependencies,
}

/// Ordered, non-empty sequence of build specs.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    specs: Vec<BuildSpec>,
}

impl BuildRequest {
    pub fn new(specs: Vec<BuildSpec>) -> Result<Self> {
        if specs.is_empty() {
            bail!("build request is empty, expected at least one build spec");
        }
        Ok(Self { specs })
    }

    /// Load a build request from a JSON file (array of build specs).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read build request {}", path.display()))?;
        let specs: Vec<BuildSpec> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build request {}", path.display()))?;
        Self::new(specs)
    }

    /// The spec recipe generation is based on.
    pub fn first(&self) -> &BuildSpec {
        &self.specs[0]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
