// File wrapper around the persisted region: this is the stand-in for the
// module's non-volatile storage primitive. The codec never sees a path.

use std::path::{Path, PathBuf};

use crate::pipeline::codec;

const STEPDRUM_DIR: &str = ".stepdrum";
const REGION_FILE: &str = "patterns.bin";

// <project_dir>/.stepdrum/patterns.bin
fn region_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(STEPDRUM_DIR).join(REGION_FILE)
}

/// Read the region, or take the factory-reset path when the file is missing,
/// truncated, or carries the wrong magic. Corruption is recovered silently.
pub fn load_region(project_dir: &Path) -> Vec<u8> {
    let mut region = std::fs::read(region_file_path(project_dir)).unwrap_or_default();
    if !codec::region_valid(&region) {
        codec::factory_reset(&mut region);
    }
    region
}

pub fn save_region(project_dir: &Path, region: &[u8]) -> anyhow::Result<()> {
    let path = region_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .stepdrum/ if needed
    }
    std::fs::write(&path, region)?;
    Ok(())
}
