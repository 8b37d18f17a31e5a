//! Project Packager
//!
//! Builds a deflate-compressed zip archive in memory from a list of folders
//! and a list of `(relative path, content)` files. Every declared folder gets
//! its own directory entry, so empty folders survive extraction.
//!
//! Paths are normalized before use: backslashes become `/` and a leading `./`
//! is dropped. Absolute paths, `..` components and empty paths are rejected.
//! Two files with the same normalized path are an error unless the packager
//! was built with [`DuplicatePolicy::LastWriteWins`]. A file whose path is
//! also a folder (declared, or the parent of another entry) is always an error.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use sdk::errors::EngineError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What to do when two files share a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail the build, naming the path
    #[default]
    Reject,

    /// Keep the later content at the position of the first occurrence
    LastWriteWins,
}

/// A finished archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArchive {
    /// `<name>.zip`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ProjectArchive {
    /// Write the archive into `dir`, creating it if needed. Returns the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!("Wrote archive {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct ProjectPackager {
    policy: DuplicatePolicy,
}

impl ProjectPackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    /// Build the archive.
    ///
    /// # Errors
    /// - `EngineError::Packaging` for an invalid name or path, or a zip failure
    /// - `EngineError::DuplicateEntry` for a repeated file path under `Reject`
    pub fn build<F, P, C>(
        &self,
        name: &str,
        folders: &[F],
        files: &[(P, C)],
    ) -> Result<ProjectArchive, EngineError>
    where
        F: AsRef<str>,
        P: AsRef<str>,
        C: AsRef<[u8]>,
    {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(EngineError::Packaging(format!(
                "Invalid archive name '{}'",
                name
            )));
        }

        let mut dirs: Vec<String> = Vec::new();
        for folder in folders {
            let dir = normalize_path(folder.as_ref())?;
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        let mut entries: Vec<(String, &[u8])> = Vec::new();
        for (path, content) in files {
            let path = normalize_path(path.as_ref())?;
            match entries.iter_mut().find(|(existing, _)| *existing == path) {
                Some(entry) => match self.policy {
                    DuplicatePolicy::Reject => return Err(EngineError::DuplicateEntry(path)),
                    DuplicatePolicy::LastWriteWins => {
                        tracing::warn!("Duplicate archive entry '{}', keeping the later content", path);
                        entry.1 = content.as_ref();
                    }
                },
                None => entries.push((path, content.as_ref())),
            }
        }

        check_collisions(&dirs, &entries)?;

        let bytes = write_zip(&dirs, &entries)
            .map_err(|e| EngineError::Packaging(format!("Failed to build archive: {}", e)))?;

        tracing::debug!(
            "Packaged '{}': {} folders, {} files, {} bytes",
            name,
            dirs.len(),
            entries.len(),
            bytes.len()
        );

        Ok(ProjectArchive {
            file_name: format!("{}.zip", name),
            bytes,
        })
    }
}

/// A file path may not double as a folder, declared or implied by a deeper entry
fn check_collisions(dirs: &[String], files: &[(String, &[u8])]) -> Result<(), EngineError> {
    for (path, _) in files {
        if dirs.contains(path) {
            return Err(EngineError::Packaging(format!(
                "'{}' is declared as both a folder and a file",
                path
            )));
        }

        let prefix = format!("{}/", path);
        let nested = dirs
            .iter()
            .chain(files.iter().map(|(other, _)| other))
            .find(|other| other.starts_with(&prefix));
        if let Some(nested) = nested {
            return Err(EngineError::Packaging(format!(
                "File '{}' is also the parent folder of '{}'",
                path, nested
            )));
        }
    }
    Ok(())
}

fn write_zip(dirs: &[String], files: &[(String, &[u8])]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for dir in dirs {
        zip.add_directory(dir.as_str(), options)?;
    }
    for (path, content) in files {
        zip.start_file(path.as_str(), options)?;
        zip.write_all(content)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Normalize a relative archive path, rejecting anything that could escape
/// the archive root.
pub fn normalize_path(raw: &str) -> Result<String, EngineError> {
    let unified = raw.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }

    if rest.starts_with('/') || has_drive_prefix(rest) {
        return Err(EngineError::Packaging(format!(
            "Absolute path '{}' is not allowed",
            raw
        )));
    }

    let components: Vec<&str> = rest
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    if components.is_empty() {
        return Err(EngineError::Packaging("Empty path is not allowed".to_string()));
    }
    if components.contains(&"..") {
        return Err(EngineError::Packaging(format!(
            "Path '{}' must not contain '..'",
            raw
        )));
    }

    Ok(components.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_entries(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            out.push((file.name().to_string(), content));
        }
        out
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./report/report.md").unwrap(), "report/report.md");
        assert_eq!(normalize_path("a\\b\\c.txt").unwrap(), "a/b/c.txt");
        assert_eq!(normalize_path("docs/").unwrap(), "docs");
        assert!(normalize_path("/etc/passwd").is_err());
        assert!(normalize_path("C:/x").is_err());
        assert!(normalize_path("a/../../b").is_err());
        assert!(normalize_path("  ").is_err());
        assert!(normalize_path("./").is_err());
    }

    #[test]
    fn test_empty_folder_gets_entry() {
        let archive = ProjectPackager::new()
            .build("proj", &["empty", "src"], &[("src/main.rs", "fn main() {}")])
            .unwrap();

        assert_eq!(archive.file_name, "proj.zip");
        let entries = read_entries(&archive.bytes);
        assert_eq!(entries[0].0, "empty/");
        assert_eq!(entries[1].0, "src/");
        assert_eq!(entries[2], ("src/main.rs".to_string(), "fn main() {}".to_string()));
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let err = ProjectPackager::new()
            .build("p", &[] as &[&str], &[("a.txt", "1"), ("./a.txt", "2")])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateEntry(ref p) if p == "a.txt"));
    }

    #[test]
    fn test_last_write_wins_keeps_first_position() {
        let archive = ProjectPackager::with_policy(DuplicatePolicy::LastWriteWins)
            .build(
                "p",
                &[] as &[&str],
                &[("a.txt", "1"), ("b.txt", "b"), ("a.txt", "2")],
            )
            .unwrap();

        let entries = read_entries(&archive.bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("a.txt".to_string(), "2".to_string()));
        assert_eq!(entries[1].0, "b.txt");
    }

    #[test]
    fn test_file_named_like_folder_rejected() {
        let err = ProjectPackager::new()
            .build("p", &["report"], &[("report", "x")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Packaging(ref msg) if msg.contains("report")));

        // Last-write-wins only resolves file/file clashes
        let err = ProjectPackager::with_policy(DuplicatePolicy::LastWriteWins)
            .build("p", &["./report/"], &[("report", "x")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Packaging(_)));
    }

    #[test]
    fn test_file_shadowing_nested_entry_rejected() {
        let err = ProjectPackager::new()
            .build("p", &[] as &[&str], &[("a/b", "inner"), ("a", "outer")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Packaging(ref msg) if msg.contains("a/b")));

        let err = ProjectPackager::new()
            .build("p", &["a/deep"], &[("a", "outer")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Packaging(_)));
    }

    #[test]
    fn test_sibling_prefixes_are_not_collisions() {
        let archive = ProjectPackager::new()
            .build("p", &["ab"], &[("a", "1"), ("a.md", "2"), ("ab/c", "3")])
            .unwrap();
        assert_eq!(read_entries(&archive.bytes).len(), 4);
    }

    #[test]
    fn test_entries_are_deflated() {
        let big = "balance sheet ".repeat(500);
        let archive = ProjectPackager::new()
            .build("p", &[] as &[&str], &[("big.txt", big.as_str())])
            .unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.as_slice())).unwrap();
        let file = zip.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert!(file.compressed_size() < file.size());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = ProjectPackager::new()
            .build("../x", &[] as &[&str], &[] as &[(&str, &str)])
            .unwrap_err();
        assert!(matches!(err, EngineError::Packaging(_)));
    }

    #[test]
    fn test_write_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ProjectPackager::new()
            .build("out", &["x"], &[] as &[(&str, &str)])
            .unwrap();
        let path = archive.write_to(&dir.path().join("nested")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), archive.bytes);
    }
}
