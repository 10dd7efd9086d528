use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Configuration {
    pub server_bind_point: String,
    pub download_directory: PathBuf,
    pub yt_dlp_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_location: Option<PathBuf>,
    #[serde(default = "default_audio_quality")]
    pub audio_quality: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub fn default_audio_quality() -> u32 {
    192
}

pub fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            server_bind_point: "0.0.0.0:8000".to_string(),
            download_directory: PathBuf::from("./downloads"),
            yt_dlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            audio_quality: default_audio_quality(),
            log_level: default_log_level(),
        }
    }
}
