//! Writing the external autoscaler's config file.

use std::path::PathBuf;

use anyhow::Result;
use asgsync_core::{AutoscalerExport, ConfigFile, Credentials};

use crate::formatting::print_success;

pub fn cmd_export(config_file: PathBuf, output: PathBuf) -> Result<()> {
    let config = ConfigFile::load(&config_file)?;
    let settings = config.settings()?;
    let credentials = Credentials::from_config(&config)?;

    AutoscalerExport::build(&settings, &credentials)?.write(&output)?;
    print_success(&format!("Wrote rax-autoscaler config to {}", output.display()));
    Ok(())
}
