//! Moves files into `<dest_root>/<category>/`, creating directories as
//! needed. Name clashes resolve by `stem_N.ext` numbering rather than
//! overwriting.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub fn move_to_category(file: &Path, dest_root: &Path, category: &str) -> Result<PathBuf> {
    let target_dir = dest_root.join(category);
    fs::create_dir_all(&target_dir)?;

    let file_name = file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("source has no file name: {}", file.display()))?;
    let mut target = target_dir.join(file_name);
    if target.exists() {
        target = resolve_conflict(&target);
    }

    if fs::rename(file, &target).is_err() {
        // rename fails across filesystems; fall back to copy + delete.
        fs::copy(file, &target)?;
        fs::remove_file(file)?;
    }
    Ok(target)
}

fn resolve_conflict(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let ext = dest
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut counter = 1;
    loop {
        let name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
