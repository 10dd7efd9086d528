use crate::model::configuration::{default_audio_quality, default_log_level, Configuration};
use crate::shared::constants::CONFIG_DIRECTORY;
use std::path::{Path, PathBuf};

const CONFIGURATION_FILE_NAME: &str = "/config.toml";

pub fn initialize() -> anyhow::Result<Configuration> {
    initialize_in(CONFIG_DIRECTORY)
}

fn initialize_in(config_directory: &str) -> anyhow::Result<Configuration> {
    if !Path::new(config_directory).exists() {
        std::fs::create_dir_all(config_directory)?;
    }

    let configuration_path = String::from(config_directory) + CONFIGURATION_FILE_NAME;
    if !Path::new(&configuration_path).exists() {
        // Read from environment variables
        let configuration = from_environment()?;
        let serialized_toml = toml::to_string_pretty(&configuration)?;
        std::fs::write(&configuration_path, serialized_toml)?;
        Ok(configuration)
    } else {
        let toml = std::fs::read_to_string(&configuration_path)?;
        let deserialized_toml = toml::from_str::<Configuration>(&toml)?;
        Ok(deserialized_toml)
    }
}

fn from_environment() -> anyhow::Result<Configuration> {
    let defaults = Configuration::default();
    let audio_quality = match std::env::var("AUDIO_QUALITY") {
        Ok(quality) => quality.parse()?,
        Err(_) => default_audio_quality(),
    };

    Ok(Configuration {
        server_bind_point: std::env::var("SERVER_BIND_POINT")
            .unwrap_or(defaults.server_bind_point),
        download_directory: std::env::var("DOWNLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_directory),
        yt_dlp_path: std::env::var("YT_DLP_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.yt_dlp_path),
        ffmpeg_location: std::env::var("FFMPEG_LOCATION").ok().map(PathBuf::from),
        audio_quality,
        log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
    })
}
