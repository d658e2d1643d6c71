//! Hand-off of fused patch lists to a mapping back-end as YAML.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pbmap::PatchList;

/// Serialized form of one frame's patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchExport {
    pub timestamp_ns: u64,
    pub patches: PatchList,
}

pub fn write_patches_yaml(path: impl AsRef<Path>, timestamp_ns: u64, patches: &PatchList) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let export = PatchExport {
        timestamp_ns,
        patches: patches.clone(),
    };
    serde_yaml::to_writer(BufWriter::new(file), &export)
        .with_context(|| format!("Failed to write patches to {}", path.display()))
}

pub fn read_patches_yaml(path: impl AsRef<Path>) -> Result<PatchExport> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let export: PatchExport = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse patches from {}", path.display()))?;
    export
        .patches
        .check_ids()
        .with_context(|| format!("Corrupt patch list in {}", path.display()))?;
    Ok(export)
}
