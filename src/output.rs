use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::scan::ScanError;
use crate::scan::metadata::RepositoryMetadata;

/// Everything one invocation produces; serialized exactly once.
#[derive(Serialize, Debug)]
pub struct ScanResult {
    pub scan_date: String,
    pub total_repositories: usize,
    pub username: String,
    pub repositories: Vec<RepositoryMetadata>,
}

impl ScanResult {
    pub fn new(
        username: &str,
        repositories: Vec<RepositoryMetadata>,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scan_date: scanned_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            total_repositories: repositories.len(),
            username: username.to_string(),
            repositories,
        }
    }

    /// Pretty JSON (2-space indent, non-ASCII kept literal) with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Write the document to `path`, or to stdout when no path is given.
pub fn write_output(result: &ScanResult, path: Option<&Path>) -> Result<(), ScanError> {
    let json = result.to_json()?;
    match path {
        Some(path) => {
            write_file(path, &json).map_err(|source| ScanError::Io {
                path: path.display().to_string(),
                source,
            })?;
            info!(path = %path.display(), "results saved");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(json.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| ScanError::Io {
                    path: "<stdout>".to_string(),
                    source,
                })?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
