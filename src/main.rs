use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use error_stack::fmt::{Charset, ColorMode};
use error_stack::{Report, ResultExt};
use tracing::info;

use crate::config::AppConfig;
use crate::console::Console;
use crate::pipeline::Pipeline;
use crate::reconcile::ReconcileOutcome;
use crate::settings::Settings;
use crate::spotify::api::SpotifyClient;
use crate::spotify::playlist::PlaylistId;
use crate::youtube::ytdlp::YtDlp;

mod config;
mod console;
mod log;
mod pipeline;
mod reconcile;
mod settings;
mod spotify;
mod track;
mod youtube;

#[derive(Debug)]
pub struct DownloaderError;
impl fmt::Display for DownloaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Playlist downloader error")
    }
}
impl std::error::Error for DownloaderError {}

pub type DownloaderResult<T> = error_stack::Result<T, DownloaderError>;

/// Download every track of a Spotify playlist as audio files found on YouTube
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Cli {
    /// Playlist url, spotify:playlist: uri or id. Falls back to
    /// ApplicationSettings.playlist_url, then to a prompt
    playlist: Option<String>,
    /// Settings file with the Spotify credentials and output preferences
    #[clap(long, short, default_value = AppConfig::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// File the run is logged to, in append mode
    #[clap(long, default_value = AppConfig::DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    /// Keep the terminal output instead of clearing it between tracks
    #[clap(long, action)]
    no_clear: bool,
}

pub struct Suggestion(String);

impl Suggestion {
    pub fn set_report() {
        Report::set_charset(Charset::Utf8);
        Report::set_color_mode(ColorMode::Color);
        Report::install_debug_hook::<Self>(|Self(value), context| {
            context.push_body(format!("{}: {value}", "suggestion".yellow()))
        });
    }
}

fn resolve_playlist(
    cli: &Cli,
    settings: &Settings,
    console: &Console,
) -> DownloaderResult<PlaylistId> {
    let input = match cli
        .playlist
        .clone()
        .or_else(|| settings.catalog.playlist_url.clone())
    {
        Some(input) => input,
        None => console
            .input("Spotify playlist url".to_string())
            .change_context(DownloaderError)?,
    };
    PlaylistId::parse(&input)
        .change_context(DownloaderError)
        .attach(Suggestion(
            "use a link like https://open.spotify.com/playlist/<id>".to_string(),
        ))
}

async fn run() -> DownloaderResult<()> {
    let cli = Cli::parse();

    Suggestion::set_report();

    let dispatch = crate::log::file_dispatch(&cli.log_file).change_context(DownloaderError)?;
    let _log_guard = tracing::dispatcher::set_default(&dispatch);
    let mut console = Console::new(!cli.no_clear);
    console.clear();

    let settings = Settings::load(&cli.config).change_context(DownloaderError)?;
    if !settings.tools.clear_console {
        console = Console::new(false);
    }

    let playlist = resolve_playlist(&cli, &settings, &console)?;

    let fetcher = YtDlp::from_settings(&settings.tools);
    let version = fetcher.verify().await.change_context(DownloaderError)?;
    info!("Using yt-dlp {}", version);

    let catalog = SpotifyClient::connect(&settings.credentials, settings.catalog.fetch_all_pages)
        .await
        .change_context(DownloaderError)
        .attach_printable("catalog authentication/query failed")
        .attach(Suggestion(format!(
            "check client_id and client_secret in {}",
            cli.config.display()
        )))?;

    let outcome = Pipeline::new(&catalog, &fetcher, &console)
        .run(&playlist, &settings.output)
        .await?;
    if let ReconcileOutcome::Missing { report_path, count } = outcome {
        println!(
            "{} tracks could not be downloaded, see {}",
            count.to_string().red(),
            report_path.display().to_string().cyan()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> DownloaderResult<()> {
    run().await
}
