use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::track::TrackRecord;

pub mod batch;
pub mod ytdlp;

#[derive(Debug)]
pub struct FetchError;

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fetch error")
    }
}

impl std::error::Error for FetchError {}

pub type FetchResult<T> = error_stack::Result<T, FetchError>;

/// Everything needed to turn one track into one audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub query: String,
    pub output_dir: PathBuf,
    pub file_stem: String,
    pub format: String,
}

impl FetchRequest {
    pub fn for_track(track: &TrackRecord, output_dir: &Path, format: &str) -> Self {
        Self {
            query: track.query(),
            output_dir: output_dir.to_path_buf(),
            file_stem: track.file_stem(),
            format: format.to_string(),
        }
    }

    /// First search hit only.
    pub fn search_term(&self) -> String {
        format!("ytsearch1:{}", self.query)
    }

    /// `<dir>/<stem>.%(ext)s`, with every `%` of the path escaped for the
    /// template engine.
    pub fn output_template(&self) -> OsString {
        let target = self.output_dir.join(&self.file_stem);
        let mut template = match target.to_str() {
            Some(text) => OsString::from(text.replace('%', "%%")),
            None => target.into_os_string(),
        };
        template.push(".%(ext)s");
        template
    }

    /// Where the transcoded file is expected to land.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.file_stem, self.format))
    }
}

/// Searches the video platform and writes the transcoded audio for a request.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<()>;
}
