//! Writes batch images to disk.
//!
//! Layout under the export directory:
//! - `replaced/<id>.png` for pairs below their threshold
//! - `original/<id>.png` for every pair with an original image
//!
//! Ids that sanitise to the same name get a `-2`, `-3`, ... suffix.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::error::{LogoError, Result};
use crate::evaluator::BatchReport;

/// Replaces anything outside `[A-Za-z0-9._-]` so an id cannot escape the directory.
fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// First name not yet in `taken`, suffixing the stem on collision.
fn unique_file_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = safe_file_name(name);
    let (stem, ext) = match base.rfind('.') {
        Some(dot) if dot > 0 => base.split_at(dot),
        _ => (base.as_str(), ""),
    };

    let mut candidate = base.clone();
    let mut n = 2u64;
    while taken.contains(&candidate) {
        candidate = format!("{}-{}{}", stem, n, ext);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

async fn write_all(dir: &Path, files: Vec<(String, &[u8])>) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LogoError::Internal(format!("Failed to create {}: {}", dir.display(), e)))?;

    let count = files.len();
    let mut taken = HashSet::with_capacity(count);
    for (name, bytes) in files {
        let path = dir.join(unique_file_name(&name, &mut taken));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| LogoError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;
    }
    Ok(count)
}

/// Writes the export selection of `report` below `dir`. Returns the file count.
pub async fn write_exports(report: &BatchReport, dir: &Path) -> Result<usize> {
    let replaced = write_all(&dir.join("replaced"), report.replaced_for_export()).await?;
    let original = write_all(&dir.join("original"), report.originals_for_export()).await?;

    info!(
        "Exported {} replacement and {} original images to {}",
        replaced,
        original,
        dir.display()
    );
    Ok(replaced + original)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("12.png"), "12.png");
        assert_eq!(safe_file_name("../etc/passwd.png"), ".._etc_passwd.png");
        assert_eq!(safe_file_name(".."), "_");
        assert_eq!(safe_file_name("a b"), "a_b");
    }

    #[test]
    fn test_unique_file_name_suffixes_collisions() {
        let mut taken = HashSet::new();
        assert_eq!(unique_file_name("a/b.png", &mut taken), "a_b.png");
        assert_eq!(unique_file_name("a_b.png", &mut taken), "a_b-2.png");
        assert_eq!(unique_file_name("a b.png", &mut taken), "a_b-3.png");
        assert_eq!(unique_file_name("..", &mut taken), "_");
        assert_eq!(unique_file_name("/", &mut taken), "_-2");
    }

    #[tokio::test]
    async fn test_colliding_ids_write_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, &[u8])> = vec![
            ("a/b.png".to_string(), b"first".as_slice()),
            ("a_b.png".to_string(), b"second".as_slice()),
        ];

        let written = write_all(dir.path(), files).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read(dir.path().join("a_b.png")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("a_b-2.png")).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_empty_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_exports(&BatchReport::default(), dir.path()).await.unwrap();

        assert_eq!(written, 0);
        assert!(dir.path().join("replaced").is_dir());
        assert!(dir.path().join("original").is_dir());
    }
}
