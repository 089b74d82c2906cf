//! Preflight command - checks the singularity install.

use anyhow::{bail, Result};

use crate::preflight::{self, SingularityCli, SINGULARITY};

/// Execute the preflight command.
pub fn cmd_preflight() -> Result<()> {
    println!("=== Singularity Preflight ===\n");

    match preflight::locate(SINGULARITY) {
        Ok(path) => println!("  ✓ {} found at {}", SINGULARITY, path.display()),
        Err(e) => {
            println!("  ✗ {}", e);
            bail!("Preflight failed: install singularity before generating recipes.");
        }
    }

    match preflight::check_version(&SingularityCli) {
        Ok(version) => println!("  ✓ version {} (>= 2.4)", version),
        Err(e) => {
            println!("  ✗ {}", e);
            bail!("Preflight failed: {}", e);
        }
    }

    println!("\nAll preflight checks passed.");
    Ok(())
}
