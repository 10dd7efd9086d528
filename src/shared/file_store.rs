use crate::model::download::DownloadJob;
use crate::model::errors::DownloadError;
use crate::model::stored_file::StoredFile;
use crate::shared::constants::{
    AUDIO_EXTENSION, LIBRARY_INDEX_FILE_NAME, STAGING_DIRECTORY_NAME,
};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    directory: PathBuf,
    library: DashMap<Uuid, StoredFile>,
    // Serializes picking a free name, moving the file and rewriting the index.
    finalize_lock: Mutex<()>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(directory: P) -> anyhow::Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        let directory = directory.as_ref().canonicalize()?;

        let staging = directory.join(STAGING_DIRECTORY_NAME);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }

        let (library, dropped) = load_library(&directory);
        tracing::info!("Loaded {} indexed file(s).", library.len());
        if dropped > 0 {
            if let Err(e) = rewrite_library(&directory, &library) {
                tracing::warn!("Failed to prune the library index: {}", e);
            }
        }

        Ok(FileStore {
            inner: Arc::new(FileStoreInner {
                directory,
                library,
                finalize_lock: Mutex::new(()),
            }),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    pub fn staging_directory(&self, id: Uuid) -> PathBuf {
        self.inner
            .directory
            .join(STAGING_DIRECTORY_NAME)
            .join(id.to_string())
    }

    pub async fn enumerate(&self) -> std::io::Result<Vec<String>> {
        let mut read_dir = tokio::fs::read_dir(&self.inner.directory).await?;
        let mut filenames = vec![];
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            if let Ok(filename) = entry.file_name().into_string() {
                if is_plain_audio_filename(&filename) {
                    filenames.push(filename);
                }
            }
        }

        filenames.sort();
        Ok(filenames)
    }

    pub async fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_audio_filename(filename) {
            return None;
        }

        let candidate = tokio::fs::canonicalize(self.inner.directory.join(filename))
            .await
            .ok()?;
        if candidate.parent() != Some(self.inner.directory.as_path()) {
            tracing::warn!("Refusing to serve {:?} outside the output directory.", &candidate);
            return None;
        }

        match tokio::fs::metadata(&candidate).await {
            Ok(metadata) if metadata.is_file() => Some(candidate),
            _ => None,
        }
    }

    pub async fn finalize(
        &self,
        job: &DownloadJob,
        converted: &Path,
    ) -> Result<StoredFile, DownloadError> {
        let title = converted
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| job.id.to_string());

        let _guard = self.inner.finalize_lock.lock().await;
        let filename = self.free_filename(&title).await;
        tokio::fs::rename(converted, self.inner.directory.join(&filename)).await?;

        let stored_file = StoredFile {
            id: job.id,
            url: job.url.clone(),
            title,
            filename,
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.library.insert(job.id, stored_file.clone());
        if let Err(e) = self.persist_library().await {
            tracing::warn!(
                "Stored {} but failed to update the library index: {}",
                &stored_file.filename,
                e
            );
        }
        Ok(stored_file)
    }

    pub async fn discard_staging(&self, id: Uuid) {
        let staging = self.staging_directory(id);
        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove staging directory {:?}: {}", &staging, e);
            }
        }
    }

    #[cfg(test)]
    pub fn library_entry(&self, id: Uuid) -> Option<StoredFile> {
        self.inner.library.get(&id).map(|entry| entry.value().clone())
    }

    async fn free_filename(&self, title: &str) -> String {
        let mut filename = format!("{}{}", title, AUDIO_EXTENSION);
        let mut counter = 1;
        while tokio::fs::metadata(self.inner.directory.join(&filename))
            .await
            .is_ok()
        {
            filename = format!("{} ({}){}", title, counter, AUDIO_EXTENSION);
            counter += 1;
        }
        filename
    }

    async fn persist_library(&self) -> Result<(), DownloadError> {
        let serialized = serialize_library(&self.inner.library)?;
        let index_path = self.inner.directory.join(LIBRARY_INDEX_FILE_NAME);
        let temporary_path = index_path.with_extension("json.tmp");
        tokio::fs::write(&temporary_path, serialized).await?;
        tokio::fs::rename(&temporary_path, &index_path).await?;
        Ok(())
    }
}

fn is_plain_audio_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename.ends_with(AUDIO_EXTENSION)
        && !filename.contains(['/', '\\', '\0'])
        && Path::new(filename).components().count() == 1
}

fn serialize_library(library: &DashMap<Uuid, StoredFile>) -> serde_json::Result<Vec<u8>> {
    let mut entries = library
        .iter()
        .map(|entry| entry.value().clone())
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    serde_json::to_vec_pretty(&entries)
}

fn rewrite_library(
    directory: &Path,
    library: &DashMap<Uuid, StoredFile>,
) -> Result<(), DownloadError> {
    let serialized = serialize_library(library)?;
    std::fs::write(directory.join(LIBRARY_INDEX_FILE_NAME), serialized)?;
    Ok(())
}

fn load_library(directory: &Path) -> (DashMap<Uuid, StoredFile>, usize) {
    let library = DashMap::new();
    let mut dropped = 0;
    let index_path = directory.join(LIBRARY_INDEX_FILE_NAME);
    let serialized = match std::fs::read_to_string(&index_path) {
        Ok(serialized) => serialized,
        Err(e) if e.kind() == ErrorKind::NotFound => return (library, dropped),
        Err(e) => {
            tracing::error!("Failed to read library index {:?}: {}", &index_path, e);
            return (library, dropped);
        }
    };

    match serde_json::from_str::<Vec<StoredFile>>(&serialized) {
        Ok(entries) => {
            for entry in entries {
                if directory.join(&entry.filename).is_file() {
                    library.insert(entry.id, entry);
                } else {
                    tracing::debug!("Dropping index entry for missing file {}.", &entry.filename);
                    dropped += 1;
                }
            }
        }
        Err(e) => tracing::error!("Library index {:?} is malformed: {}", &index_path, e),
    }

    (library, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn staged_file(store: &FileStore, job: &DownloadJob, name: &str) -> PathBuf {
        let staging = store.staging_directory(job.id);
        tokio::fs::create_dir_all(&staging).await.unwrap();
        let path = staging.join(name);
        tokio::fs::write(&path, b"ID3\x03\x00audio").await.unwrap();
        path
    }

    #[tokio::test]
    async fn enumerate_lists_only_audio_files() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::open(directory.path()).unwrap();
        std::fs::write(directory.path().join("b.mp3"), b"x").unwrap();
        std::fs::write(directory.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(directory.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(directory.path().join(".hidden.mp3"), b"x").unwrap();
        #[cfg(unix)]
        std::fs::write(directory.path().join("a\\b.mp3"), b"x").unwrap();
        std::fs::create_dir(directory.path().join("folder.mp3")).unwrap();

        let first = store.enumerate().await.unwrap();
        let second = store.enumerate().await.unwrap();
        assert_eq!(first, vec!["a.mp3".to_string(), "b.mp3".to_string()]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn open_creates_directory_and_clears_staging() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("downloads");
        let leftover = directory.join(STAGING_DIRECTORY_NAME).join("stale");
        std::fs::create_dir_all(&leftover).unwrap();

        let store = FileStore::open(&directory).unwrap();
        assert!(store.directory().is_dir());
        assert!(!directory.join(STAGING_DIRECTORY_NAME).exists());
    }

    #[tokio::test]
    async fn resolve_rejects_traversal_and_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("downloads");
        let store = FileStore::open(&directory).unwrap();
        std::fs::write(root.path().join("secret.mp3"), b"x").unwrap();
        std::fs::write(directory.join("song.mp3"), b"x").unwrap();
        std::fs::write(directory.join(LIBRARY_INDEX_FILE_NAME), b"[]").unwrap();

        assert!(store.resolve("song.mp3").await.is_some());
        assert!(store.resolve("../secret.mp3").await.is_none());
        assert!(store.resolve("..\\secret.mp3").await.is_none());
        assert!(store.resolve(LIBRARY_INDEX_FILE_NAME).await.is_none());
        assert!(store.resolve("missing.mp3").await.is_none());
        assert!(store.resolve("").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlinks_leaving_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("downloads");
        let store = FileStore::open(&directory).unwrap();
        std::fs::write(root.path().join("outside.mp3"), b"x").unwrap();
        std::os::unix::fs::symlink(root.path().join("outside.mp3"), directory.join("link.mp3"))
            .unwrap();

        assert!(store.resolve("link.mp3").await.is_none());
    }

    #[tokio::test]
    async fn finalize_avoids_title_collisions_and_indexes_files() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::open(directory.path()).unwrap();

        let first_job = DownloadJob::new("https://valid.example/one");
        let converted = staged_file(&store, &first_job, "SomeTitle.mp3").await;
        let first = store.finalize(&first_job, &converted).await.unwrap();

        let second_job = DownloadJob::new("https://valid.example/two");
        let converted = staged_file(&store, &second_job, "SomeTitle.mp3").await;
        let second = store.finalize(&second_job, &converted).await.unwrap();

        assert_eq!(first.filename, "SomeTitle.mp3");
        assert_eq!(second.filename, "SomeTitle (1).mp3");
        assert_eq!(second.title, "SomeTitle");
        assert_eq!(
            store.enumerate().await.unwrap(),
            vec!["SomeTitle (1).mp3".to_string(), "SomeTitle.mp3".to_string()]
        );
        assert_eq!(store.library_entry(second_job.id), Some(second.clone()));

        let reopened = FileStore::open(directory.path()).unwrap();
        assert_eq!(reopened.library_entry(first_job.id), Some(first));
        assert_eq!(reopened.library_entry(second_job.id), Some(second));
    }

    #[tokio::test]
    async fn index_entries_for_deleted_files_are_dropped() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::open(directory.path()).unwrap();
        let job = DownloadJob::new("https://valid.example/video");
        let converted = staged_file(&store, &job, "Gone.mp3").await;
        store.finalize(&job, &converted).await.unwrap();

        std::fs::remove_file(directory.path().join("Gone.mp3")).unwrap();
        let reopened = FileStore::open(directory.path()).unwrap();
        assert!(reopened.library_entry(job.id).is_none());

        let rewritten =
            std::fs::read_to_string(directory.path().join(LIBRARY_INDEX_FILE_NAME)).unwrap();
        let entries = serde_json::from_str::<Vec<StoredFile>>(&rewritten).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn index_write_failure_keeps_the_stored_file() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::open(directory.path()).unwrap();
        // A directory in place of the index makes the final rename fail.
        std::fs::create_dir(directory.path().join(LIBRARY_INDEX_FILE_NAME)).unwrap();
        std::fs::write(directory.path().join(LIBRARY_INDEX_FILE_NAME).join("keep"), b"x").unwrap();

        let job = DownloadJob::new("https://valid.example/video");
        let converted = staged_file(&store, &job, "SomeTitle.mp3").await;
        let stored_file = store.finalize(&job, &converted).await.unwrap();

        assert_eq!(stored_file.filename, "SomeTitle.mp3");
        assert_eq!(store.enumerate().await.unwrap(), vec!["SomeTitle.mp3".to_string()]);
        assert_eq!(store.library_entry(job.id), Some(stored_file));
    }

    #[tokio::test]
    async fn discard_staging_is_quiet_when_nothing_was_staged() {
        let directory = tempfile::tempdir().unwrap();
        let store = FileStore::open(directory.path()).unwrap();
        let job = DownloadJob::new("https://valid.example/video");
        staged_file(&store, &job, "Leftover.mp3").await;

        store.discard_staging(job.id).await;
        store.discard_staging(job.id).await;
        assert!(!store.staging_directory(job.id).exists());
    }
}
