//! Sindef CLI - generate Singularity definition files and build images.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sindef::commands;
use sindef::config::{self, GenerateConfig, ImageFormat, ModuleScheme};

#[derive(Parser)]
#[command(name = "sindef")]
#[command(about = "Singularity definition file generator for EasyBuild package builds")]
#[command(
    after_help = "QUICK START:\n  sindef preflight                              Check the singularity install\n  sindef generate specs.json \\\n      --bootstrap docker:ubuntu:18.04           Write Singularity.<name>-<version>\n  sindef generate specs.json \\\n      --bootstrap shub:base:latest --build-image  Also build the image"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Singularity definition file (and optionally build the image)
    Generate {
        /// Resolved build request: JSON array of package build specs
        request: PathBuf,

        /// Bootstrap directive: localimage:<path> | shub:<image>[:<tag>] | docker:<image>[:<tag>]
        #[arg(long)]
        bootstrap: Option<String>,

        /// Easyconfig repository cloned inside the container (<host>:<path>:<branch>)
        #[arg(long)]
        easyconfig_repo: Option<String>,

        /// Easyblock repository cloned inside the container (<host>:<path>:<branch>:<file>)
        #[arg(long)]
        easyblock_repo: Option<String>,

        /// Name for the built image (default: derived from the definition file name)
        #[arg(long)]
        image_name: Option<String>,

        /// Image format used with --build-image
        #[arg(long, value_enum, default_value = "squashfs")]
        image_format: ImageFormat,

        /// Build the image after writing the definition file
        #[arg(long)]
        build_image: bool,

        /// Module naming scheme used inside the container
        #[arg(long, value_enum, default_value = "easybuild")]
        module_scheme: ModuleScheme,

        /// Directory the definition file and image are written to
        /// (default: $SINDEF_OUTPUT_DIR, or the current directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Check that singularity is installed and recent enough
    Preflight,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            request,
            bootstrap,
            easyconfig_repo,
            easyblock_repo,
            image_name,
            image_format,
            build_image,
            module_scheme,
            output_dir,
        } => {
            let config = GenerateConfig {
                bootstrap,
                easyconfig_repo,
                easyblock_repo,
                image_name,
                image_format,
                build_image,
                module_scheme,
                output_dir: output_dir.unwrap_or_else(config::default_output_dir),
            };
            commands::cmd_generate(&request, &config)?;
        }

        Commands::Preflight => {
            commands::cmd_preflight()?;
        }
    }

    Ok(())
}
