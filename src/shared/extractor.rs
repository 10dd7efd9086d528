use crate::model::configuration::Configuration;
use crate::model::errors::DownloadError;
use crate::shared::constants::{AUDIO_EXTENSION, AUDIO_FORMAT};
use axum::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const FORMAT_SELECTION: &str = "bestaudio/best";
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, url: &str, staging_directory: &Path) -> Result<PathBuf, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    yt_dlp_path: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    audio_quality: u32,
}

impl YtDlpExtractor {
    pub fn new(configuration: &Configuration) -> Self {
        YtDlpExtractor {
            yt_dlp_path: configuration.yt_dlp_path.clone(),
            ffmpeg_location: configuration.ffmpeg_location.clone(),
            audio_quality: configuration.audio_quality,
        }
    }

    pub async fn is_available(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn build_args(&self, url: &str, staging_directory: &Path) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            FORMAT_SELECTION.to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            AUDIO_FORMAT.to_string(),
            "--audio-quality".to_string(),
            format!("{}K", self.audio_quality),
            "-o".to_string(),
            staging_directory
                .join(OUTPUT_TEMPLATE)
                .to_string_lossy()
                .to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];

        if let Some(ffmpeg_location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg_location.to_string_lossy().to_string());
        }

        // Keep the URL behind `--` so it is never parsed as an option.
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(&self, url: &str, staging_directory: &Path) -> Result<PathBuf, DownloadError> {
        let args = self.build_args(url, staging_directory);
        tracing::debug!("Running {:?} for {}", &self.yt_dlp_path, url);

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(DownloadError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("yt-dlp stderr: {}", stderr);
            return Err(DownloadError::ExtractorFailed {
                code: output.status.code(),
                message: stderr
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let printed = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from);

        match printed {
            Some(path) if is_audio_file(&path) && path.starts_with(staging_directory) => {
                if tokio::fs::metadata(&path).await.is_ok() {
                    return Ok(path);
                }
                find_converted_file(staging_directory).await
            }
            _ => find_converted_file(staging_directory).await,
        }
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(AUDIO_EXTENSION))
        .unwrap_or(false)
}

// Used when yt-dlp printed nothing usable.
async fn find_converted_file(staging_directory: &Path) -> Result<PathBuf, DownloadError> {
    let mut read_dir = tokio::fs::read_dir(staging_directory).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_audio_file(&path) {
            return Ok(path);
        }
    }

    Err(DownloadError::OutputMissing(staging_directory.to_path_buf()))
}
