use std::path::Path;

use tracing::{error, info};

use crate::console::Console;
use crate::log::report_summary;
use crate::track::TrackCollection;
use crate::youtube::{AudioFetcher, FetchRequest};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Fetches every track in collection order, one at a time.
///
/// A failed track is logged and skipped; nothing here aborts the batch.
/// Missing files are picked up afterwards by the reconciliation step.
pub async fn fetch_all(
    fetcher: &dyn AudioFetcher,
    tracks: &TrackCollection,
    format: &str,
    output_dir: &Path,
    console: &Console,
) -> BatchOutcome {
    let total = tracks.len();
    let mut outcome = BatchOutcome::default();

    for (track_index, track) in tracks.iter().enumerate() {
        let queue_index = track_index + 1;
        console.progress(queue_index, total, &track.title, "Trying to download the song.");

        let request = FetchRequest::for_track(track, output_dir, format);
        let spinner = console.spinner(format!("Downloading {}", request.query));
        let result = fetcher.fetch(&request).await;
        spinner.finish_and_clear();

        match result {
            Ok(()) => {
                console.progress(queue_index, total, &track.title, "Downloaded successfully!");
                info!("{} downloaded successfully.", track.title);
                console.info(&format!("Saved {}", request.output_file().display()));
                outcome.succeeded += 1;
            }
            Err(report) => {
                let cause = report_summary(&report);
                console.progress(queue_index, total, &track.title, "Download failed.");
                console.failure(&format!("Error downloading {}: {}", track.title, cause));
                error!("Error downloading {}: {}", track.title, cause);
                outcome.failed += 1;
            }
        }
        console.clear();
    }

    info!(
        "Batch finished: {} downloaded, {} failed",
        outcome.succeeded, outcome.failed
    );
    outcome
}
