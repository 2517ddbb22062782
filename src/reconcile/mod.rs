use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use tracing::info;

use crate::config::AppConfig;
use crate::console::Console;
use crate::track::TrackCollection;

#[derive(Debug)]
pub struct ReconcileError;

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reconcile error")
    }
}

impl std::error::Error for ReconcileError {}

pub type ReconcileResult<T> = error_stack::Result<T, ReconcileError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Complete,
    Missing { report_path: PathBuf, count: usize },
}

/// Compares the expected `<title>.<format>` files with one listing of
/// `output_dir` and writes the queries of the absent ones to
/// `missing_songs.txt`. A file that exists counts as downloaded, whatever its
/// content.
pub fn report(
    tracks: &TrackCollection,
    output_dir: &Path,
    format: &str,
    console: &Console,
) -> ReconcileResult<ReconcileOutcome> {
    let downloaded_files = fs::read_dir(output_dir)
        .into_report()
        .change_context(ReconcileError)
        .attach_printable(format!("Failed to list {}", output_dir.display()))?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<Result<HashSet<OsString>, _>>()
        .into_report()
        .change_context(ReconcileError)
        .attach_printable(format!("Failed to list {}", output_dir.display()))?;

    let missing_songs = tracks
        .iter()
        .filter(|track| !downloaded_files.contains(&OsString::from(track.file_name(format))))
        .map(|track| track.query())
        .collect::<Vec<_>>();

    if missing_songs.is_empty() {
        console.success("You have downloaded all the songs successfully!");
        info!("All songs were downloaded successfully.");
        return Ok(ReconcileOutcome::Complete);
    }

    let report_path = output_dir.join(AppConfig::MISSING_SONGS_FILE);
    let content = missing_songs
        .iter()
        .map(|query| format!("{}\n", query))
        .collect::<String>();
    fs::write(&report_path, content)
        .into_report()
        .change_context(ReconcileError)
        .attach_printable(format!("Failed to write {}", report_path.display()))?;

    let message = format!(
        "{} missing songs logged in {}",
        missing_songs.len(),
        report_path.display()
    );
    console.warning(&message);
    info!("{}", message);
    Ok(ReconcileOutcome::Missing {
        report_path,
        count: missing_songs.len(),
    })
}
