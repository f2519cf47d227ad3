//! `genomeshader transitions`: dump the haplotype transition matrices between
//! two variants as JSON.

use super::load_input;
use crate::error::CliError;
use anyhow::{Context, Result};
use genomeshader_core::{compute_transitions, VariantId};
use std::path::Path;

pub fn execute(input: &Path, src: u64, dst: u64, output: Option<&Path>) -> Result<()> {
    let doc = load_input(input)?;
    let find = |id: u64| {
        doc.variants
            .iter()
            .find(|v| v.id == VariantId(id))
            .ok_or(CliError::UnknownVariant { id })
    };
    let (src, dst) = (find(src)?, find(dst)?);

    let transitions = compute_transitions(src, dst);
    log::info!(
        "{} -> {}: {} observed and {} phased haplotype transitions",
        src.id,
        dst.id,
        transitions.observed.total(),
        transitions.phased.total()
    );

    let json = serde_json::to_string_pretty(&transitions).context("serializing transitions")?;
    match output {
        Some(path) => {
            std::fs::write(path, json).map_err(CliError::from)?;
            log::info!("wrote transitions to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
