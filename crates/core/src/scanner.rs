//! Enumerates candidate files under the source root. Order is walkdir
//! order and is stable for a given tree; routing and review both follow
//! this scan order.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn scan(source: &Path, excludes: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let exclude_set = build_globset(excludes)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.path() == source || should_descend(e.path(), &exclude_set))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        if entry.file_type().is_dir() || is_hidden(path) || is_excluded(path, &exclude_set) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, excludes: &GlobSet) -> bool {
    !is_excluded(path, excludes) && !is_hidden(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, excludes: &GlobSet) -> bool {
    excludes.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_files_recursively_skipping_hidden() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("inbox");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested").join("b.pdf"), "b").unwrap();
        fs::write(src.join(".hidden"), "h").unwrap();

        let files = scan(&src, &[]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 2);
        assert!(names.contains(&"a.txt".to_string()));
        assert!(names.contains(&"b.pdf".to_string()));
    }

    #[test]
    fn exclude_globs_are_honoured() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("inbox");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("keep.txt"), "k").unwrap();
        fs::write(src.join("skip.tmp"), "s").unwrap();

        let files = scan(&src, &["*.tmp".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.txt"));
    }

    #[test]
    fn order_is_stable_across_scans() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("inbox");
        fs::create_dir_all(&src).unwrap();
        for name in ["one.txt", "two.txt", "three.txt"] {
            fs::write(src.join(name), name).unwrap();
        }

        let first = scan(&src, &[]).unwrap();
        let second = scan(&src, &[]).unwrap();
        assert_eq!(first, second);
    }
}
