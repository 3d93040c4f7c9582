// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Image discovery
//!
//! Produces the deterministic image list a run operates on: extension
//! filter, dedup by resolved path, lexicographic order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::Result;

/// File extensions treated as images
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Check whether a path has an image extension
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Scan a directory for images, optionally descending into subfolders.
///
/// Results are deduplicated by resolved path and sorted lexicographically
/// so that a run processes images in a stable order.
pub fn scan_images(dir: &Path, subfolders: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if subfolders { usize::MAX } else { 1 };

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_image(path) {
            debug!("Skipping non-image file: {:?}", path);
            continue;
        }

        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if seen.insert(resolved) {
            images.push(path.to_path_buf());
        }
    }

    images.sort();

    info!("Found {} images under {:?}", images.len(), dir);
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"test").unwrap();
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("a.JPEG")));
        assert!(is_image(Path::new("a.png")));
        assert!(is_image(Path::new("a.webp")));
        assert!(!is_image(Path::new("a.txt")));
        assert!(!is_image(Path::new("a")));
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.jpg"));
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("notes.txt"));

        let images = scan_images(dir.path(), true).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);
    }

    #[test]
    fn test_scan_subfolders_toggle() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.jpg"));
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("deep.jpg"));

        let flat = scan_images(dir.path(), false).unwrap();
        assert_eq!(flat.len(), 1);

        let recursive = scan_images(dir.path(), true).unwrap();
        assert_eq!(recursive.len(), 2);
    }
}
