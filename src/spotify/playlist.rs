use std::fmt;

use colored::Colorize;
use error_stack::{IntoReport, Report, ResultExt};
use lazy_regex::regex_is_match;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::console::Console;
use crate::spotify::{SpotifyError, SpotifyResult};
use crate::track::{TrackCollection, TrackRecord};

/// Base62 playlist identifier, taken from an open.spotify.com url, a
/// `spotify:playlist:` uri or given as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn parse(input: &str) -> SpotifyResult<Self> {
        let input = input.trim();
        let candidate = if input.starts_with("spotify:") {
            let mut sections = input.split(':');
            sections
                .by_ref()
                .find(|section| *section == "playlist")
                .and_then(|_| sections.next())
                .map(str::to_string)
        } else if input.contains("://") {
            let playlist_url = Url::parse(input)
                .into_report()
                .change_context(SpotifyError)
                .attach_printable(format!("{} is not a valid url", input))?;
            let mut sections = playlist_url
                .path_segments()
                .ok_or(SpotifyError)
                .into_report()
                .attach_printable("Url has no path")?;
            // locale prefixes such as /intl-es/ come before the playlist segment
            let id = sections
                .by_ref()
                .find(|section| *section == "playlist")
                .and_then(|_| sections.next())
                .map(str::to_string);
            id
        } else {
            Some(input.to_string())
        };
        let id = candidate
            .ok_or(SpotifyError)
            .into_report()
            .attach_printable(format!("{} is not a playlist url", input))?;
        Self::validate(&id)
    }

    fn validate(id: &str) -> SpotifyResult<Self> {
        if regex_is_match!(r"^[0-9A-Za-z]{1,64}$", id) {
            Ok(Self(id.to_string()))
        } else {
            Err(Report::new(SpotifyError)
                .attach_printable(format!("{:?} is not a Spotify playlist id", id)))
        }
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of `GET /playlists/{id}/tracks`. Items stay as raw JSON so a
/// single odd entry cannot fail the whole page.
#[derive(Deserialize, Clone, Debug)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<Value>,
    pub next: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
struct ApiArtist {
    name: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
struct ApiTrack {
    id: Option<String>,
    name: Option<String>,
    artists: Option<Vec<ApiArtist>>,
}

#[derive(Deserialize, Clone, Debug)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

/// Why a playlist item was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotATrackObject,
    MissingTrack,
    MissingName,
    MissingArtists,
    MissingArtistName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotATrackObject => "item is not a playlist track object",
            SkipReason::MissingTrack => "item has no track",
            SkipReason::MissingName => "track has no name",
            SkipReason::MissingArtists => "track has no artists",
            SkipReason::MissingArtistName => "first artist has no name",
        };
        f.write_str(reason)
    }
}

pub fn parse_item(item: &Value) -> Result<TrackRecord, SkipReason> {
    let item: PlaylistItem =
        serde_json::from_value(item.clone()).map_err(|_| SkipReason::NotATrackObject)?;
    let track = item.track.ok_or(SkipReason::MissingTrack)?;
    let artists = track.artists.ok_or(SkipReason::MissingArtists)?;
    let artist = artists
        .into_iter()
        .next()
        .ok_or(SkipReason::MissingArtists)?
        .name
        .ok_or(SkipReason::MissingArtistName)?;
    let title = track.name.ok_or(SkipReason::MissingName)?;
    Ok(TrackRecord::new(artist, title, track.id))
}

/// Adds every well-formed item to `tracks`, in page order.
pub fn collect_tracks(
    items: &[Value],
    tracks: &mut TrackCollection,
    console: &Console,
) {
    for (position, item) in items.iter().enumerate() {
        match parse_item(item) {
            Ok(record) => {
                console.info(&format!(
                    "Adding {} by {} to the playlist data",
                    record.title.yellow(),
                    record.artist.cyan()
                ));
                let key = record.key();
                if let Some(replaced) = tracks.insert(record) {
                    let message = format!(
                        "Duplicate playlist entry {}: replacing earlier entry {}",
                        key,
                        replaced.query()
                    );
                    console.warning(&message);
                    warn!("{}", message);
                }
            }
            Err(reason) => {
                let name = item["track"]["name"].as_str().unwrap_or("<unnamed>");
                let message = format!(
                    "Missing data for playlist item {} ({}): {}. Skipping this item",
                    position + 1,
                    name,
                    reason
                );
                console.warning(&message);
                warn!("{}", message);
            }
        }
    }
}
