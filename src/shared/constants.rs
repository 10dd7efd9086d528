pub const CONFIG_DIRECTORY: &str = "./config";

pub const AUDIO_FORMAT: &str = "mp3";
pub const AUDIO_EXTENSION: &str = ".mp3";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

pub const LIBRARY_INDEX_FILE_NAME: &str = "library.json";
pub const STAGING_DIRECTORY_NAME: &str = ".staging";

pub const DOWNLOAD_STARTED_MESSAGE: &str = "Descarga iniciada para la URL: ";
pub const FILE_NOT_FOUND_MESSAGE: &str = "Archivo no encontrado";
