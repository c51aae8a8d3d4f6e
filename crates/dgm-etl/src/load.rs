//! Loading cached pages into the catalog.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use dgm_core::model::DgmId;
use dgm_core::schema::Database;

use crate::error::{LoadError, LoadResult};
use crate::extract::{Extraction, Extractor};

/// Totals for one batch load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Cached pages in `html_dir`, sorted by show id.
///
/// Only files named `<number>.html` directly inside the directory count.
pub fn page_files(html_dir: &Path) -> LoadResult<Vec<(DgmId, PathBuf)>> {
    let mut pages = Vec::new();

    for entry in WalkDir::new(html_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: html_dir.display().to_string(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<DgmId>().ok())
        else {
            log::debug!("Skipping {}", path.display());
            continue;
        };

        pages.push((id, path.to_path_buf()));
    }

    pages.sort_by_key(|(id, _)| *id);
    Ok(pages)
}

/// Extract every cached page and write the shows to the catalog.
///
/// Pages are processed in increasing id order, one write transaction per
/// show. Unreadable or malformed pages are logged and counted as failed
/// without stopping the batch; catalog errors abort it.
pub fn load_directory(db: &Database, html_dir: &Path) -> LoadResult<LoadReport> {
    let extractor = Extractor::new()?;

    let mut report = LoadReport::default();
    for (id, path) in page_files(html_dir)? {
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        match extractor.extract(id, &raw) {
            Ok(Extraction::Show(show)) => {
                db.upsert_show(&show)?;
                log::debug!("Loaded show {}: {}, {}", id, show.venue, show.location);
                report.loaded += 1;
            }
            Ok(Extraction::NotFound) => {
                log::debug!("Show {} does not exist", id);
                report.not_found += 1;
            }
            Err(e) => {
                log::warn!("Failed to extract show {} from {}: {}", id, path.display(), e);
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Load complete: {} loaded, {} not found, {} failed",
        report.loaded,
        report.not_found,
        report.failed
    );
    Ok(report)
}
