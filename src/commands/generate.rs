//! Generate command - the full recipe generation sequence.

use anyhow::Result;
use std::path::Path;

use crate::bootstrap::Bootstrap;
use crate::buildspec::BuildRequest;
use crate::config::GenerateConfig;
use crate::image;
use crate::preflight::{self, SingularityCli};
use crate::recipe;
use crate::repo::{self, HttpProbe};

/// Execute the generate command.
///
/// Stages run in a fixed order and any failure aborts the whole sequence:
/// preflight, input parsing/validation, document assembly, document write,
/// and (only with `--build-image`) the image build. A failed image build
/// leaves the written definition file in place so the build can be retried
/// without regenerating.
pub fn cmd_generate(request_path: &Path, config: &GenerateConfig) -> Result<()> {
    // Stage 1: the external tool must be usable before anything is written.
    let version = preflight::check(&SingularityCli)?;
    println!("singularity {} ... OK", version);

    // Stage 2: parse and validate every input source.
    let request = BuildRequest::load(request_path)?;
    let bootstrap = Bootstrap::parse_option(config.bootstrap.as_deref())?;
    bootstrap.validate()?;

    let mut ec_repo = None;
    let mut eb_repo = None;
    if config.easyconfig_repo.is_some() || config.easyblock_repo.is_some() {
        let probe = HttpProbe::new()?;
        if let Some(raw) = config.easyconfig_repo.as_deref() {
            ec_repo = Some(repo::parse_easyconfig_repo(raw, &probe)?);
        }
        if let Some(raw) = config.easyblock_repo.as_deref() {
            eb_repo = Some(repo::parse_easyblock_repo(raw, &probe)?);
        }
    }

    // Stage 3: assemble and write the definition document.
    let document = recipe::build(
        &bootstrap,
        &request,
        config.module_scheme,
        ec_repo.as_ref(),
        eb_repo.as_ref(),
    );
    let written = document.write_to(&config.output_dir)?;
    println!("Wrote Singularity definition file: {}", written.display());

    // Stage 4: optionally drive the image build.
    if config.build_image {
        let artifact = image::build_image(
            &config.output_dir,
            document.file_name(),
            config.image_format,
            config.image_name.as_deref(),
        )?;
        println!("Image artifact: {}", artifact.path.display());
    }

    Ok(())
}
