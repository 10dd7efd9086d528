use crate::shared::download_queue::DownloadQueue;
use crate::shared::file_store::FileStore;

#[derive(Clone)]
pub struct AppState {
    pub file_store: FileStore,
    pub download_queue: DownloadQueue,
}
