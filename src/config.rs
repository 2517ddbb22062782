/// `AppConfig` holds static configuration values for the application,
/// such as service endpoints and default file locations.
pub struct AppConfig;

impl AppConfig {
    /// Settings file read when `--config` is not given.
    pub const DEFAULT_CONFIG_PATH: &'static str = "config/application.cfg";
    /// Append-mode event log written in the working directory.
    pub const DEFAULT_LOG_FILE: &'static str = "AppInfo.log";
    /// Report written to the output directory when some tracks are missing.
    pub const MISSING_SONGS_FILE: &'static str = "missing_songs.txt";

    pub const SPOTIFY_TOKEN_URL: &'static str = "https://accounts.spotify.com/api/token";
    pub const SPOTIFY_API_URL: &'static str = "https://api.spotify.com/v1";
    /// Page size requested from the playlist tracks endpoint.
    pub const SPOTIFY_PAGE_LIMIT: u32 = 100;

    pub const YT_DLP_PROGRAM: &'static str = "yt-dlp";
    pub const FFMPEG_PROGRAM: &'static str = "ffmpeg";
    /// Bitrate target handed to the audio extractor.
    pub const DEFAULT_AUDIO_QUALITY: &'static str = "192K";
    /// Browser identity sent to the video platform; default client identifiers get blocked.
    pub const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
}
