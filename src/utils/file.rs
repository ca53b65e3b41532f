//! File utilities for ingestion.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Collect the files under `path` whose file name matches `pattern`, sorted
/// by path. A file path is returned as-is regardless of the pattern.
pub fn collect_files(path: &Path, pattern: &glob::Pattern) -> walkdir::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if pattern.matches(&name) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Read file content with size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read_to_string(path)
}

/// File name used as a document title.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_matches_file_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("notes.md"), "md").unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let pattern = glob::Pattern::new("*.txt").unwrap();
        let files = collect_files(dir.path(), &pattern).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();

        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_collect_single_file_ignores_pattern() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.md");
        fs::write(&path, "x").unwrap();

        let pattern = glob::Pattern::new("*.txt").unwrap();
        assert_eq!(collect_files(&path, &pattern).unwrap(), vec![path]);
    }

    #[test]
    fn test_read_file_content_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "0123456789").unwrap();

        assert_eq!(read_file_content(&path, 10).unwrap(), "0123456789");
        let err = read_file_content(&path, 9).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_file_content_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(read_file_content(&path, 1024).is_err());
    }
}
