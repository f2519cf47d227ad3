//! Command implementations for the GenomeShader CLI

pub mod render;
pub mod transitions;

use crate::error::{CliError, CliResult};
use genomeshader_core::io::{load_variants, VariantDocument};
use std::path::Path;

/// Load a payload, turning a missing file into a suggestion-bearing error.
pub fn load_input(path: &Path) -> CliResult<VariantDocument> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    Ok(load_variants(path)?)
}
