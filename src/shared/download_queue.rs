use crate::model::download::DownloadJob;
use crate::model::errors::{DownloadError, QueueClosed};
use crate::model::stored_file::StoredFile;
use crate::shared::extractor::AudioExtractor;
use crate::shared::file_store::FileStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Clone)]
pub struct DownloadQueue {
    sender: mpsc::UnboundedSender<DownloadJob>,
}

impl DownloadQueue {
    pub fn start(
        extractor: Arc<dyn AudioExtractor>,
        file_store: FileStore,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(receiver, extractor, file_store));
        (DownloadQueue { sender }, dispatcher)
    }

    pub fn submit<S: Into<String>>(&self, url: S) -> Result<Uuid, QueueClosed> {
        let job = DownloadJob::new(url);
        let id = job.id;
        self.sender.send(job).map_err(|_| QueueClosed)?;
        Ok(id)
    }
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<DownloadJob>,
    extractor: Arc<dyn AudioExtractor>,
    file_store: FileStore,
) {
    while let Some(job) = receiver.recv().await {
        tracing::info!("Starting download {} for {}", job.id, &job.url);
        tokio::spawn(process_job(job, extractor.clone(), file_store.clone()));
    }

    tracing::debug!("Download queue closed.");
}

async fn process_job(job: DownloadJob, extractor: Arc<dyn AudioExtractor>, file_store: FileStore) {
    match run_job(&job, extractor.as_ref(), &file_store).await {
        Ok(stored_file) => tracing::info!("Download completed: {}", &stored_file.filename),
        Err(e) => tracing::error!("Failed to download {}: {}", &job.url, e),
    }

    file_store.discard_staging(job.id).await;
}

async fn run_job(
    job: &DownloadJob,
    extractor: &dyn AudioExtractor,
    file_store: &FileStore,
) -> Result<StoredFile, DownloadError> {
    let staging = file_store.staging_directory(job.id);
    tokio::fs::create_dir_all(&staging).await?;
    let converted = extractor.extract(&job.url, &staging).await?;
    file_store.finalize(job, &converted).await
}
