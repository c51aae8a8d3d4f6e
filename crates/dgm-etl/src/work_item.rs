use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;

/// One scrape run flowing through the fetch → load → index stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    /// Unique per run so the state store does not skip finished stages.
    id: String,

    /// Page cache the run reads and writes.
    pub html_dir: PathBuf,
}

impl ScrapeJob {
    #[must_use]
    pub fn new(id: impl Into<String>, html_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            html_dir,
        }
    }

    /// A job id stamped with the current time.
    #[must_use]
    pub fn timestamped(html_dir: PathBuf) -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        Self::new(format!("scrape-{stamp}"), html_dir)
    }
}

impl WorkItem for ScrapeJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ScrapeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.html_dir.display())
    }
}
