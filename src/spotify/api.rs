use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use colored::Colorize;
use error_stack::{IntoReport, Report, ResultExt};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::console::Console;
use crate::settings::Credentials;
use crate::spotify::playlist::{collect_tracks, PlaylistId, PlaylistTracksPage};
use crate::spotify::{PlaylistCatalog, SpotifyError, SpotifyResult};
use crate::track::TrackCollection;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

/// Anything that can serve a playlist tracks page by url.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_page(&self, url: &str) -> SpotifyResult<PlaylistTracksPage>;
}

/// Spotify Web API client authenticated with the client credentials flow.
///
/// The token is requested once in [`SpotifyClient::connect`] and reused for
/// every call made through the instance.
pub struct SpotifyClient {
    client: Client,
    access_token: String,
    fetch_all_pages: bool,
}

impl SpotifyClient {
    pub async fn connect(credentials: &Credentials, fetch_all_pages: bool) -> SpotifyResult<Self> {
        let client = Client::new();
        let auth_string = format!("{}:{}", credentials.client_id, credentials.client_secret);
        let encoded_auth = general_purpose::STANDARD.encode(auth_string);

        let response = client
            .post(AppConfig::SPOTIFY_TOKEN_URL)
            .header("Authorization", format!("Basic {}", encoded_auth))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .into_report()
            .change_context(SpotifyError)
            .attach_printable("catalog authentication failed: token request could not be sent")?;
        let token_response = check_status(response, "catalog authentication failed")
            .await?
            .json::<TokenResponse>()
            .await
            .into_report()
            .change_context(SpotifyError)
            .attach_printable("catalog authentication failed: unexpected token response")?;

        Ok(Self {
            client,
            access_token: token_response.access_token,
            fetch_all_pages,
        })
    }
}

#[async_trait]
impl PageSource for SpotifyClient {
    async fn get_page(&self, url: &str) -> SpotifyResult<PlaylistTracksPage> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .into_report()
            .change_context(SpotifyError)
            .attach_printable(format!("catalog query failed: could not reach {}", url))?;
        check_status(response, "catalog query failed")
            .await?
            .json::<PlaylistTracksPage>()
            .await
            .into_report()
            .change_context(SpotifyError)
            .attach_printable("catalog query failed: unexpected playlist tracks response")
    }
}

#[async_trait]
impl PlaylistCatalog for SpotifyClient {
    async fn fetch_playlist_tracks(
        &self,
        playlist: &PlaylistId,
        console: &Console,
    ) -> SpotifyResult<TrackCollection> {
        walk_pages(self, playlist, self.fetch_all_pages, console).await
    }
}

pub fn first_page_url(playlist: &PlaylistId) -> SpotifyResult<Url> {
    Url::parse_with_params(
        &format!("{}/playlists/{}/tracks", AppConfig::SPOTIFY_API_URL, playlist),
        &[
            ("limit", AppConfig::SPOTIFY_PAGE_LIMIT.to_string()),
            ("offset", "0".to_string()),
            ("additional_types", "track".to_string()),
        ],
    )
    .into_report()
    .change_context(SpotifyError)
}

/// Reads the first page of `playlist` and, when `fetch_all_pages` is set,
/// every page after it by following `next`.
pub async fn walk_pages(
    source: &dyn PageSource,
    playlist: &PlaylistId,
    fetch_all_pages: bool,
    console: &Console,
) -> SpotifyResult<TrackCollection> {
    console.info("Getting playlist tracks from Spotify API...");
    let mut tracks = TrackCollection::new();
    let page = source.get_page(first_page_url(playlist)?.as_str()).await?;
    collect_tracks(&page.items, &mut tracks, console);

    let mut next_url = page.next;
    while fetch_all_pages {
        let Some(url) = next_url.take() else {
            break;
        };
        let page = source.get_page(&url).await?;
        collect_tracks(&page.items, &mut tracks, console);
        next_url = page.next;
    }
    if next_url.is_some() {
        let message = format!(
            "Playlist {} has more than {} items, only the first page is used",
            playlist,
            AppConfig::SPOTIFY_PAGE_LIMIT
        );
        console.warning(&message);
        warn!("{}", message);
    }
    if tracks.is_empty() {
        let message = format!("Playlist {} has no downloadable tracks", playlist);
        console.warning(&message);
        warn!("{}", message);
    }

    info!("Fetched {} tracks from playlist {}", tracks.len(), playlist);
    console.info(&format!(
        "Found {} tracks in the playlist",
        tracks.len().to_string().cyan()
    ));
    Ok(tracks)
}

async fn check_status(response: Response, failure: &str) -> SpotifyResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(failure, status, &body))
}

fn status_error(failure: &str, status: StatusCode, body: &str) -> Report<SpotifyError> {
    Report::new(SpotifyError).attach_printable(format!(
        "{}: HTTP {} {}",
        failure,
        status,
        body.trim()
    ))
}
