use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use configparser::ini::Ini;
use error_stack::{IntoReport, Report, ResultExt};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::Suggestion;

#[derive(Debug)]
pub struct SettingsError;

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Settings error")
    }
}

impl std::error::Error for SettingsError {}

pub type SettingsResult<T> = error_stack::Result<T, SettingsError>;

const CREDENTIALS_SECTION: &str = "SpotifyAPICredentials";
const APPLICATION_SECTION: &str = "ApplicationSettings";
const TOOLS_SECTION: &str = "Tools";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub output_path: PathBuf,
    /// Audio format handed to the transcoder and used as the file extension.
    pub output_format: String,
}

/// Optional `ApplicationSettings` keys that drive the catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogSettings {
    pub playlist_url: Option<String>,
    pub fetch_all_pages: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub yt_dlp_path: PathBuf,
    pub ffmpeg_location: Option<PathBuf>,
    pub audio_quality: String,
    pub fetch_timeout: Option<Duration>,
    pub clear_console: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            yt_dlp_path: PathBuf::from(AppConfig::YT_DLP_PROGRAM),
            ffmpeg_location: None,
            audio_quality: AppConfig::DEFAULT_AUDIO_QUALITY.to_string(),
            fetch_timeout: None,
            clear_console: true,
        }
    }
}

/// Reads the settings file once and hands out typed groups.
///
/// Section and key names are matched case-insensitively.
pub struct ConfigReader {
    path: PathBuf,
    ini: Ini,
}

impl ConfigReader {
    pub fn open(path: &Path) -> SettingsResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                let message = format!(
                    "Configuration file {} not found or could not be read.",
                    path.display()
                );
                println!("{}", message.red());
                error!("{} ({})", message, err);
                return Err(Report::new(err))
                    .change_context(SettingsError)
                    .attach_printable(message);
            }
        };
        let reader = match Self::parse(path, text) {
            Ok(reader) => reader,
            Err(cause) => {
                let message = format!(
                    "Configuration file {} could not be parsed.",
                    path.display()
                );
                println!("{}", message.red());
                error!("{} ({})", message, cause);
                return Err(Report::new(SettingsError)
                    .attach_printable(cause)
                    .attach_printable(message));
            }
        };
        let message = format!("Configuration file {} read successfully.", path.display());
        println!("{}", message.green());
        info!("{}", message);
        Ok(reader)
    }

    /// Parses `text` as the contents of `path` without touching the filesystem.
    pub fn parse(path: &Path, text: String) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(text)?;
        Ok(Self {
            path: path.to_path_buf(),
            ini,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the section or one of the keys is missing; the reason is
    /// printed and logged.
    pub fn credentials(&self) -> Option<Credentials> {
        let client_id = self.required(CREDENTIALS_SECTION, "client_id")?;
        let client_secret = self.required(CREDENTIALS_SECTION, "client_secret")?;
        Some(Credentials {
            client_id,
            client_secret,
        })
    }

    pub fn output_settings(&self) -> Option<OutputSettings> {
        let output_path = self.required(APPLICATION_SECTION, "output_path")?;
        let output_format = self.required(APPLICATION_SECTION, "output_file_type")?;
        Some(OutputSettings {
            output_path: PathBuf::from(output_path.trim_matches('"')),
            output_format,
        })
    }

    pub fn catalog_settings(&self) -> SettingsResult<CatalogSettings> {
        let playlist_url = self
            .ini
            .get(APPLICATION_SECTION, "playlist_url")
            .map(|value| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty());
        let fetch_all_pages = self
            .ini
            .getboolcoerce(APPLICATION_SECTION, "fetch_all_pages")
            .map_err(|cause| invalid_value(APPLICATION_SECTION, "fetch_all_pages", cause))?
            .unwrap_or(false);
        Ok(CatalogSettings {
            playlist_url,
            fetch_all_pages,
        })
    }

    pub fn tool_settings(&self) -> SettingsResult<ToolSettings> {
        let mut tools = ToolSettings::default();
        if let Some(path) = self.optional_path(TOOLS_SECTION, "yt_dlp_path") {
            tools.yt_dlp_path = path;
        }
        tools.ffmpeg_location = self.optional_path(TOOLS_SECTION, "ffmpeg_location");
        if let Some(quality) = self
            .ini
            .get(APPLICATION_SECTION, "audio_quality")
            .filter(|value| !value.is_empty())
        {
            tools.audio_quality = quality;
        }
        if let Some(seconds) = self
            .ini
            .getuint(TOOLS_SECTION, "fetch_timeout_secs")
            .map_err(|cause| invalid_value(TOOLS_SECTION, "fetch_timeout_secs", cause))?
        {
            tools.fetch_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }
        if let Some(clear) = self
            .ini
            .getboolcoerce(TOOLS_SECTION, "clear_console")
            .map_err(|cause| invalid_value(TOOLS_SECTION, "clear_console", cause))?
        {
            tools.clear_console = clear;
        }
        Ok(tools)
    }

    fn has_section(&self, section: &str) -> bool {
        let wanted = section.to_lowercase();
        self.ini
            .sections()
            .iter()
            .any(|name| name.to_lowercase() == wanted)
    }

    fn required(&self, section: &str, option: &str) -> Option<String> {
        let missing = if !self.has_section(section) {
            format!("Section not found: {}", section)
        } else {
            match self.ini.get(section, option) {
                Some(value) => return Some(value),
                None => format!("Option not found: {}", option),
            }
        };
        println!("{}", missing.red());
        error!("{} ({})", missing, self.path.display());
        None
    }

    fn optional_path(&self, section: &str, option: &str) -> Option<PathBuf> {
        self.ini
            .get(section, option)
            .map(|value| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

fn invalid_value(section: &str, option: &str, cause: String) -> Report<SettingsError> {
    Report::new(SettingsError).attach_printable(format!("{}.{}: {}", section, option, cause))
}

/// Everything a run needs, validated up front.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub output: OutputSettings,
    pub catalog: CatalogSettings,
    pub tools: ToolSettings,
}

impl Settings {
    /// Missing required keys are fatal here instead of surfacing later as a
    /// half-configured run.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let reader = ConfigReader::open(path).attach(Suggestion(format!(
            "create {} with [{}] and [{}] sections",
            path.display(),
            CREDENTIALS_SECTION,
            APPLICATION_SECTION
        )))?;
        Self::from_reader(&reader)
    }

    pub fn from_reader(reader: &ConfigReader) -> SettingsResult<Self> {
        let credentials = reader
            .credentials()
            .ok_or(SettingsError)
            .into_report()
            .attach_printable("Spotify API credentials are missing")
            .attach(Suggestion(format!(
                "set client_id and client_secret under [{}] in {}",
                CREDENTIALS_SECTION,
                reader.path().display()
            )))?;
        let output = reader
            .output_settings()
            .ok_or(SettingsError)
            .into_report()
            .attach_printable("Application output settings are missing")
            .attach(Suggestion(format!(
                "set output_path and output_file_type under [{}] in {}",
                APPLICATION_SECTION,
                reader.path().display()
            )))?;
        Ok(Self {
            credentials,
            output,
            catalog: reader.catalog_settings()?,
            tools: reader.tool_settings()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::log::testing::CapturedLog;

    use super::*;

    const VALID_CONFIG: &str = r#"[SpotifyAPICredentials]
client_id = 0123456789abcdef
client_secret = fedcba9876543210

[ApplicationSettings]
output_path = "/home/user/Music/Road Trip"
output_file_type = mp3
"#;

    fn reader_for(text: &str) -> ConfigReader {
        ConfigReader::parse(Path::new("application.cfg"), text.to_string()).unwrap()
    }

    #[test]
    fn test_valid_config_returns_requested_keys() {
        let captured = CapturedLog::new();
        let _guard = captured.install();
        let reader = reader_for(VALID_CONFIG);

        let credentials = reader.credentials().unwrap();
        assert_eq!(credentials.client_id, "0123456789abcdef");
        assert_eq!(credentials.client_secret, "fedcba9876543210");

        let output = reader.output_settings().unwrap();
        assert_eq!(output.output_path, PathBuf::from("/home/user/Music/Road Trip"));
        assert_eq!(output.output_format, "mp3");
        assert!(captured.contents().is_empty());
    }

    #[test]
    fn test_only_output_path_is_unquoted() {
        let reader = reader_for(
            "[SpotifyAPICredentials]\nclient_id = \"quoted\"\nclient_secret = x\n\n[ApplicationSettings]\noutput_path = \"\"C:\\Music\"\"\noutput_file_type = \"flac\"\n",
        );
        assert_eq!(reader.credentials().unwrap().client_id, "\"quoted\"");
        let output = reader.output_settings().unwrap();
        assert_eq!(output.output_path, PathBuf::from("C:\\Music"));
        assert_eq!(output.output_format, "\"flac\"");
    }

    #[test]
    fn test_missing_key_returns_none_and_logs() {
        let captured = CapturedLog::new();
        let _guard = captured.install();
        let reader = reader_for(
            "[SpotifyAPICredentials]\nclient_id = abc\n\n[ApplicationSettings]\noutput_file_type = mp3\n",
        );

        assert!(reader.credentials().is_none());
        assert!(reader.output_settings().is_none());

        let contents = captured.contents();
        assert!(contents.contains("ERROR - Option not found: client_secret"));
        assert!(contents.contains("ERROR - Option not found: output_path"));
    }

    #[test]
    fn test_missing_section_returns_none() {
        let captured = CapturedLog::new();
        let _guard = captured.install();
        let reader = reader_for("[ApplicationSettings]\noutput_path = /music\noutput_file_type = mp3\n");

        assert!(reader.credentials().is_none());
        assert!(captured
            .contents()
            .contains("Section not found: SpotifyAPICredentials"));
    }

    #[test]
    fn test_load_fails_fast_on_missing_keys() {
        let reader = reader_for("[ApplicationSettings]\noutput_path = /music\noutput_file_type = mp3\n");
        let report = Settings::from_reader(&reader).unwrap_err();
        assert!(report.contains::<SettingsError>());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.cfg");
        fs::write(
            &path,
            format!(
                "{}playlist_url = https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M\naudio_quality = 320K\n\n[Tools]\nffmpeg_location = \"C:/ffmpeg/bin\"\nfetch_timeout_secs = 300\nclear_console = no\n",
                VALID_CONFIG
            ),
        )
        .unwrap();
        let captured = CapturedLog::new();
        let _guard = captured.install();
        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.output.output_format, "mp3");
        assert_eq!(
            settings.catalog.playlist_url.as_deref(),
            Some("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M")
        );
        assert!(!settings.catalog.fetch_all_pages);
        assert_eq!(settings.tools.audio_quality, "320K");
        assert_eq!(
            settings.tools.ffmpeg_location,
            Some(PathBuf::from("C:/ffmpeg/bin"))
        );
        assert_eq!(settings.tools.fetch_timeout, Some(Duration::from_secs(300)));
        assert!(!settings.tools.clear_console);
        assert_eq!(settings.tools.yt_dlp_path, PathBuf::from("yt-dlp"));
        assert!(captured.contents().contains("INFO - Configuration file"));
        assert!(captured.contents().contains("read successfully"));
    }

    #[test]
    fn test_tool_defaults() {
        let reader = reader_for(VALID_CONFIG);
        assert_eq!(reader.tool_settings().unwrap(), ToolSettings::default());
        assert_eq!(reader.catalog_settings().unwrap(), CatalogSettings::default());
    }

    #[test]
    fn test_fetch_all_pages_and_zero_timeout() {
        let reader = reader_for(&format!(
            "{}fetch_all_pages = yes\n\n[Tools]\nfetch_timeout_secs = 0\n",
            VALID_CONFIG
        ));
        assert!(reader.catalog_settings().unwrap().fetch_all_pages);
        assert_eq!(reader.tool_settings().unwrap().fetch_timeout, None);
    }

    #[test]
    fn test_invalid_optional_values_are_errors() {
        let reader = reader_for(&format!("{}\n[Tools]\nfetch_timeout_secs = soon\n", VALID_CONFIG));
        assert!(reader.tool_settings().is_err());
        let reader = reader_for(&format!("{}fetch_all_pages = maybe\n", VALID_CONFIG));
        assert!(reader.catalog_settings().is_err());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let captured = CapturedLog::new();
        let _guard = captured.install();
        let result = Settings::load(&dir.path().join("absent.cfg"));
        assert!(result.is_err());
        assert!(captured
            .contents()
            .contains("ERROR - Configuration file"));
        assert!(captured.contents().contains("not found or could not be read"));
    }

    #[test]
    fn test_unparsable_file_is_reported_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.cfg");
        fs::write(&path, "[SpotifyAPICredentials\nclient_id = abc\n").unwrap();
        let captured = CapturedLog::new();
        let _guard = captured.install();

        let report = Settings::load(&path).unwrap_err();

        assert!(report.contains::<SettingsError>());
        let contents = captured.contents();
        assert!(contents.contains(&format!(
            "ERROR - Configuration file {} could not be parsed.",
            path.display()
        )));
        assert!(!contents.contains("read successfully"));
    }

    #[test]
    fn test_options_outside_any_section_do_not_satisfy_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.cfg");
        fs::write(&path, "client_id = abc\n").unwrap();
        let captured = CapturedLog::new();
        let _guard = captured.install();

        assert!(Settings::load(&path).is_err());
        assert!(captured
            .contents()
            .contains("ERROR - Section not found: SpotifyAPICredentials"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let credentials = Credentials {
            client_id: "id".to_string(),
            client_secret: "very-secret".to_string(),
        };
        assert!(!format!("{:?}", credentials).contains("very-secret"));
    }
}
