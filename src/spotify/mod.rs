use std::fmt;

use async_trait::async_trait;

use crate::console::Console;
use crate::spotify::playlist::PlaylistId;
use crate::track::TrackCollection;

pub mod api;
pub mod playlist;

#[derive(Debug)]
pub struct SpotifyError;

impl fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Spotify error")
    }
}

impl std::error::Error for SpotifyError {}

pub type SpotifyResult<T> = error_stack::Result<T, SpotifyError>;

/// Source of playlist track metadata.
#[async_trait]
pub trait PlaylistCatalog: Send + Sync {
    /// Malformed entries are skipped with a warning; transport and
    /// authentication failures are returned as errors.
    async fn fetch_playlist_tracks(
        &self,
        playlist: &PlaylistId,
        console: &Console,
    ) -> SpotifyResult<TrackCollection>;
}
