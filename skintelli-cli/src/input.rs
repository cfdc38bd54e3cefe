//! Input collection.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;
use skintelli_utils::{SUPPORTED_EXTENSIONS, has_supported_extension};
use walkdir::WalkDir;

/// Collect all image paths from a file or directory, sorted.
///
/// A single file is returned as-is so that validation can report a precise
/// reason when its format is not supported.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!(
            "input path is neither file nor directory: {}",
            path.display()
        );
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if has_supported_extension(entry.path()) {
            images.push(entry.path().to_path_buf());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }
    images.sort();

    if images.is_empty() {
        anyhow::bail!(
            "no images found at {} (supported extensions: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn directories_are_walked_and_filtered() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        for name in ["b.PNG", "a.jpg", "notes.txt", "nested/c.bmp", "d.webp"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }

        let found = collect_images(dir.path()).expect("collect");
        let names: Vec<String> = found
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .expect("prefix")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, ["a.jpg", "b.PNG", "nested/c.bmp"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("readme.md"), b"x").expect("write");
        let err = collect_images(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no images found"));
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(collect_images(Path::new("no/such/input")).is_err());
    }
}
