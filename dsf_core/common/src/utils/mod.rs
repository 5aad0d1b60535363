use crate::traits::IsFileExtension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every file below `dir` with the given extension, sorted so callers get a
/// stable processing order.
pub fn paths_with_ext(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().is_extension(ext))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths
}

/// File name without extension, e.g. `models/orders.sql` -> `orders`.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
