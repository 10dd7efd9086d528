pub mod configuration;
pub mod constants;
pub mod download_queue;
pub mod extractor;
pub mod file_store;
