use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use error_stack::{IntoReport, Report, ResultExt};
use tokio::process::Command;

use crate::config::AppConfig;
use crate::settings::ToolSettings;
use crate::youtube::{AudioFetcher, FetchError, FetchRequest, FetchResult};
use crate::Suggestion;

/// Runs the `yt-dlp` program once per track: search, pick the best audio-only
/// stream and let ffmpeg transcode it to the requested format.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    audio_quality: String,
    user_agent: String,
    timeout: Option<Duration>,
}

impl YtDlp {
    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self {
            program: tools.yt_dlp_path.clone(),
            ffmpeg_location: tools.ffmpeg_location.clone(),
            audio_quality: tools.audio_quality.clone(),
            user_agent: AppConfig::USER_AGENT.to_string(),
            timeout: tools.fetch_timeout,
        }
    }

    pub fn args(&self, request: &FetchRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            request.format.clone().into(),
            "--audio-quality".into(),
            self.audio_quality.clone().into(),
            "--output".into(),
            request.output_template(),
            "--add-header".into(),
            format!("User-Agent:{}", self.user_agent).into(),
        ];
        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.clone().into_os_string());
        }
        args.extend(
            ["--no-playlist", "--quiet", "--no-warnings"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(request.search_term().into());
        args
    }

    /// Fails when yt-dlp or ffmpeg cannot be found, before any track is
    /// attempted. Returns the yt-dlp version.
    pub async fn verify(&self) -> FetchResult<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .ok()
            .filter(|output| output.status.success())
            .ok_or(FetchError)
            .into_report()
            .attach_printable(format!("{} could not be started", self.program.display()))
            .attach(Suggestion(
                "install yt-dlp or set yt_dlp_path under [Tools] in the configuration file"
                    .to_string(),
            ))?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();

        match &self.ffmpeg_location {
            Some(location) if !location.exists() => {
                return Err(Report::new(FetchError)
                    .attach_printable(format!(
                        "ffmpeg location {} does not exist",
                        location.display()
                    ))
                    .attach(Suggestion(
                        "point ffmpeg_location under [Tools] at the ffmpeg binary or its folder"
                            .to_string(),
                    )));
            }
            Some(_) => {}
            None => {
                Command::new(AppConfig::FFMPEG_PROGRAM)
                    .arg("-version")
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .ok()
                    .filter(|status| status.success())
                    .ok_or(FetchError)
                    .into_report()
                    .attach_printable("ffmpeg was not found on the PATH")
                    .attach(Suggestion(
                        "install ffmpeg or set ffmpeg_location under [Tools] in the configuration file"
                            .to_string(),
                    ))?;
            }
        }
        Ok(version)
    }
}

#[async_trait]
impl AudioFetcher for YtDlp {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<()> {
        let mut command = Command::new(&self.program);
        command
            .args(self.args(request))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .into_report()
                .change_context(FetchError)
                .attach_printable(format!("gave up after {:?}", limit))?,
            None => command.output().await,
        }
        .into_report()
        .change_context(FetchError)
        .attach_printable(format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Report::new(FetchError).attach_printable(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                error_lines(&stderr)
            )));
        }
        Ok(())
    }
}

/// The `ERROR:` lines of the program output, or its last line when there are none.
fn error_lines(stderr: &str) -> String {
    let errors = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR"))
        .collect::<Vec<_>>();
    if errors.is_empty() {
        stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or("no output")
            .to_string()
    } else {
        errors.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::log::report_summary;
    use crate::track::TrackRecord;

    use super::*;

    fn request() -> FetchRequest {
        let track = TrackRecord::new("Moderat".to_string(), "A New Error".to_string(), None);
        FetchRequest::for_track(&track, Path::new("/music"), "mp3")
    }

    fn fetcher(program: &str) -> YtDlp {
        YtDlp::from_settings(&ToolSettings {
            yt_dlp_path: PathBuf::from(program),
            ..ToolSettings::default()
        })
    }

    #[test]
    fn test_args() {
        let mut ytdlp = fetcher("yt-dlp");
        ytdlp.ffmpeg_location = Some(PathBuf::from("C:/ffmpeg/bin"));
        let args = ytdlp
            .args(&request())
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>();
        let user_agent = format!("User-Agent:{}", AppConfig::USER_AGENT);
        let expected = [
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
            "--output",
            "/music/A New Error.%(ext)s",
            "--add-header",
            user_agent.as_str(),
            "--ffmpeg-location",
            "C:/ffmpeg/bin",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "ytsearch1:Moderat - A New Error",
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn test_args_without_ffmpeg_location() {
        let args = fetcher("yt-dlp").args(&request());
        assert!(!args.contains(&OsString::from("--ffmpeg-location")));
    }

    #[test]
    fn test_error_lines() {
        let stderr = "[youtube:search] Searching\nERROR: [youtube] abc: Video unavailable\n";
        assert_eq!(error_lines(stderr), "ERROR: [youtube] abc: Video unavailable");
        assert_eq!(error_lines("something odd\n\n"), "something odd");
        assert_eq!(error_lines(""), "no output");
    }

    #[tokio::test]
    async fn test_missing_program_is_a_failure() {
        let ytdlp = fetcher("definitely-not-an-installed-yt-dlp");
        assert!(ytdlp.fetch(&request()).await.is_err());
        assert!(ytdlp.verify().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_the_outcome() {
        assert!(fetcher("true").fetch(&request()).await.is_ok());
        assert!(fetcher("false").fetch(&request()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_stops_a_hanging_download() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp");
        fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut ytdlp = fetcher(script.to_str().unwrap());
        ytdlp.timeout = Some(Duration::from_millis(500));
        let started = Instant::now();
        let report = ytdlp.fetch(&request()).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(report_summary(&report).starts_with("gave up after 500ms"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_leaves_quick_runs_alone() {
        let mut ytdlp = fetcher("true");
        ytdlp.timeout = Some(Duration::from_secs(5));
        assert!(ytdlp.fetch(&request()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verify_rejects_missing_ffmpeg_location() {
        let mut ytdlp = fetcher("true");
        ytdlp.ffmpeg_location = Some(PathBuf::from("/nonexistent/ffmpeg/bin"));
        assert!(ytdlp.verify().await.is_err());
    }
}
