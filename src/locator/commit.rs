//! Replacement committer
//!
//! Reads each candidate, asks a locator for new content, and writes back
//! only the files that actually change.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::error::ReplaceError;
use super::scanner::{resolve_within, CandidateFile};

/// What to do when more than one candidate file matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanOutMode {
    /// Rewrite every file that matches
    #[default]
    BestEffortMultiFile,
    /// Fail without writing unless exactly one file would change
    StrictSingleFile,
}

/// Per-file result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementOutcome {
    Unchanged,
    Modified,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: String,
    pub outcome: ReplacementOutcome,
}

/// Everything the committer did, in processing order
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Files where the locator found its target, changed or not
    pub matched: usize,
    /// Relative paths written, in processing order
    pub modified: Vec<String>,
    /// Read and write errors, in processing order
    pub failed: Vec<ReplaceError>,
    pub outcomes: Vec<FileOutcome>,
}

struct PlannedEdit {
    index: usize,
    path: PathBuf,
    content: String,
}

/// Apply `locate` to every candidate under `root`.
///
/// Per-file I/O failures are logged and recorded as [`ReplacementOutcome::Failed`]
/// without stopping the run. Only a strict-mode ambiguity aborts, and it
/// does so before anything is written.
pub fn commit<F>(
    root: &Path,
    candidates: &[CandidateFile],
    mode: FanOutMode,
    mut locate: F,
) -> Result<CommitReport, ReplaceError>
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut report = CommitReport::default();
    let mut planned = Vec::new();

    for candidate in candidates {
        let file = candidate.relative.clone();
        let index = report.outcomes.len();

        let Some(path) = resolve_within(root, &file) else {
            warn!(file = %file, "Refusing path outside project root");
            report.outcomes.push(FileOutcome {
                file,
                outcome: ReplacementOutcome::Failed("outside project root".to_string()),
            });
            continue;
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                let err = ReplaceError::io(&path, err);
                warn!(error = %err, "Skipping unreadable candidate");
                report.outcomes.push(FileOutcome {
                    file,
                    outcome: ReplacementOutcome::Failed(err.to_string()),
                });
                report.failed.push(err);
                continue;
            }
        };

        if let Some(new_content) = locate(&file, &content) {
            report.matched += 1;
            if new_content != content {
                planned.push(PlannedEdit {
                    index,
                    path,
                    content: new_content,
                });
            }
        }

        report.outcomes.push(FileOutcome {
            file,
            outcome: ReplacementOutcome::Unchanged,
        });
    }

    if mode == FanOutMode::StrictSingleFile && planned.len() > 1 {
        let files = planned
            .iter()
            .map(|edit| report.outcomes[edit.index].file.clone())
            .collect();
        return Err(ReplaceError::Ambiguous { files });
    }

    for edit in planned {
        let outcome = &mut report.outcomes[edit.index];
        match write_atomic(&edit.path, &edit.content) {
            Ok(()) => {
                info!(file = %outcome.file, "Rewrote file");
                outcome.outcome = ReplacementOutcome::Modified;
                report.modified.push(outcome.file.clone());
            }
            Err(err) => {
                let err = ReplaceError::io(&edit.path, err);
                warn!(error = %err, "Failed to write candidate");
                outcome.outcome = ReplacementOutcome::Failed(err.to_string());
                report.failed.push(err);
            }
        }
    }

    Ok(report)
}

/// Write through a temp file in the same directory, keeping permissions
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
