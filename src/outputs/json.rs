//! JSON output for the news record set and the diagnostics snapshot.
//!
//! The record file is the pipeline's only compatibility surface and is
//! replaced wholesale on every run: the JSON is written to a sibling temp
//! file and renamed over the target, so readers never observe a partially
//! written file. The diagnostics snapshot is best-effort and never fails the
//! run.

use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::models::{Diagnostics, NewsRecord};

/// Write the final ordered records to `path`, replacing any previous file.
///
/// # Errors
///
/// Returns an error if serialization, directory creation, the temp-file
/// write or the final rename fails.
#[instrument(level = "info", skip_all, fields(path = %path.display(), records = records.len()))]
pub async fn write_records(records: &[NewsRecord], path: &Path) -> Result<(), Box<dyn Error>> {
    write_json_atomic(records, path).await?;
    info!("Wrote news records");
    Ok(())
}

/// Write the diagnostics snapshot, logging instead of failing.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_diagnostics(diagnostics: &Diagnostics, path: &Path) {
    match write_json_atomic(diagnostics, path).await {
        Ok(()) => info!(sources = diagnostics.sources.len(), "Wrote diagnostics snapshot"),
        Err(e) => warn!(error = %e, "Failed to write diagnostics snapshot; continuing"),
    }
}

async fn write_json_atomic<T: Serialize + ?Sized>(
    value: &T,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output directory");
            return Err(e.into());
        }
    }

    let tmp = temp_path(path);
    fs::write(&tmp, json.as_bytes()).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceKind, SourceReport, SourceStatus};

    fn record(title: &str) -> NewsRecord {
        NewsRecord {
            id: format!("https://x/{title}"),
            title: title.to_string(),
            url: format!("https://x/{title}"),
            published_at: "2024-01-01T00:00:00.000Z".to_string(),
            excerpt: String::new(),
            image_url: String::new(),
            source_label: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_records_creates_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/news.json");

        write_records(&[record("a"), record("b")], &path).await.unwrap();
        let first: Vec<NewsRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(first.len(), 2);

        write_records(&[record("c")], &path).await.unwrap();
        let second: Vec<NewsRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(second, vec![record("c")]);
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_records_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let result = write_records(&[record("a")], &blocker.join("news.json")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_diagnostics_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let diagnostics = Diagnostics {
            captured_at: "2024-01-01T00:00:00.000Z".to_string(),
            sources: vec![SourceReport {
                label: "Press".to_string(),
                kind: SourceKind::Press,
                url: "https://p/feed".to_string(),
                status: SourceStatus::Ok,
                parsed: 3,
                kept: 1,
            }],
            merged: 1,
            output: 1,
            sample: vec![record("a")],
        };

        // Must not panic or propagate.
        write_diagnostics(&diagnostics, &blocker.join("diag.json")).await;

        let ok_path = dir.path().join("diag.json");
        write_diagnostics(&diagnostics, &ok_path).await;
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&ok_path).unwrap()).unwrap();
        assert_eq!(v["capturedAt"], "2024-01-01T00:00:00.000Z");
        assert_eq!(v["sources"][0]["status"], "ok");
        assert_eq!(v["sources"][0]["kept"], 1);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("/data/news.json")),
            PathBuf::from("/data/news.json.tmp")
        );
    }
}
