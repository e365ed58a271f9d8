//! Recursive disk usage of a project directory

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskUsage {
    pub bytes: u64,
    pub human: String,
}

/// Sum the size of every regular file under `path`.
///
/// Symlinks are not followed. Entries that cannot be read are skipped.
pub fn measure(path: &Path) -> DiskUsage {
    let mut bytes = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => bytes += meta.len(),
            Err(e) => debug!(path = %entry.path().display(), error = %e, "no metadata"),
        }
    }
    DiskUsage {
        bytes,
        human: format_bytes(bytes),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0}KB", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0GB");
    }

    #[test]
    fn test_measure_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();
        std::fs::create_dir_all(dir.path().join("data/nested")).unwrap();
        std::fs::write(dir.path().join("data/nested/b.bin"), vec![0u8; 1500]).unwrap();

        let usage = measure(dir.path());
        assert_eq!(usage.bytes, 1600);
        assert_eq!(usage.human, "2KB");
    }

    #[test]
    fn test_measure_missing_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let usage = measure(&dir.path().join("nope"));
        assert_eq!(usage.bytes, 0);
        assert_eq!(usage.human, "0B");
    }
}
