//! Filesystem helpers shared by the source and packaging stages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recursively copy `src` into `dst`, creating `dst` if needed.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Collect every regular file under `root` whose name satisfies `pred`.
///
/// Results are sorted so callers see a stable order. A missing `root`
/// yields an empty list.
pub fn find_files(root: &Path, pred: &dyn Fn(&str) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if root.is_dir() {
        walk(root, pred, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, pred: &dyn Fn(&str) -> bool, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, pred, found)?;
        } else if entry.file_name().to_str().is_some_and(pred) {
            found.push(path);
        }
    }
    Ok(())
}

/// Whether `name` ends with `.ext`, ignoring ASCII case.
pub fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
