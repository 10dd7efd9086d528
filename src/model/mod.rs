pub mod app_state;
pub mod configuration;
pub mod download;
pub mod errors;
pub mod stored_file;
