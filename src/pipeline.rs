use std::fs;

use error_stack::{IntoReport, ResultExt};
use tracing::info;

use crate::console::Console;
use crate::reconcile::{self, ReconcileOutcome};
use crate::settings::OutputSettings;
use crate::spotify::playlist::PlaylistId;
use crate::spotify::PlaylistCatalog;
use crate::youtube::batch::fetch_all;
use crate::youtube::AudioFetcher;
use crate::{DownloaderError, DownloaderResult};

/// Catalog lookup, then every download, then reconciliation. Each stage
/// finishes before the next one starts.
pub struct Pipeline<'a> {
    catalog: &'a dyn PlaylistCatalog,
    fetcher: &'a dyn AudioFetcher,
    console: &'a Console,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        catalog: &'a dyn PlaylistCatalog,
        fetcher: &'a dyn AudioFetcher,
        console: &'a Console,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            console,
        }
    }

    pub async fn run(
        &self,
        playlist: &PlaylistId,
        output: &OutputSettings,
    ) -> DownloaderResult<ReconcileOutcome> {
        info!("Starting download of playlist {}", playlist);
        let tracks = self
            .catalog
            .fetch_playlist_tracks(playlist, self.console)
            .await
            .change_context(DownloaderError)
            .attach_printable("catalog authentication/query failed")?;

        fs::create_dir_all(&output.output_path)
            .into_report()
            .change_context(DownloaderError)
            .attach_printable(format!(
                "Failed to create output directory {}",
                output.output_path.display()
            ))?;

        let batch = fetch_all(
            self.fetcher,
            &tracks,
            &output.output_format,
            &output.output_path,
            self.console,
        )
        .await;
        self.console.info(&format!(
            "Downloaded {} of {} tracks, {} failed",
            batch.succeeded,
            tracks.len(),
            batch.failed
        ));

        reconcile::report(
            &tracks,
            &output.output_path,
            &output.output_format,
            self.console,
        )
        .change_context(DownloaderError)
    }
}
