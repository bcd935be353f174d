use std::{future::Future, io::ErrorKind, ops::Deref, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::fs::File;
use tracing::debug;

use crate::fs::operations::write_atomic;

use super::entities::AttendanceRecord;

/// Interface for abstracting storage of attendance records.
pub trait RecordStore {
    /// Returns the whole persisted collection. A missing backing file counts as an empty
    /// collection, not as an error.
    fn load_all(&self) -> impl Future<Output = Result<Vec<AttendanceRecord>>> + Send;

    /// Replaces the whole persisted collection.
    fn save_all(&self, records: &[AttendanceRecord]) -> impl Future<Output = Result<()>> + Send;

    /// Runs one read-modify-write cycle under an exclusive lock, so two concurrent
    /// mutations can never overwrite each other's rows. The closure works on the loaded
    /// collection and reports through [Update] whether it has to be written back; domain
    /// failures from the closure pass through in the inner result without persisting
    /// anything.
    fn update<T, E, F>(&self, apply: F) -> impl Future<Output = Result<Result<T, E>>> + Send
    where
        F: FnOnce(&mut Vec<AttendanceRecord>) -> Result<Update<T>, E> + Send,
        T: Send,
        E: Send;
}

impl<S: Deref> RecordStore for S
where
    S::Target: RecordStore,
{
    fn load_all(&self) -> impl Future<Output = Result<Vec<AttendanceRecord>>> + Send {
        self.deref().load_all()
    }

    fn save_all(&self, records: &[AttendanceRecord]) -> impl Future<Output = Result<()>> + Send {
        self.deref().save_all(records)
    }

    fn update<T, E, F>(&self, apply: F) -> impl Future<Output = Result<Result<T, E>>> + Send
    where
        F: FnOnce(&mut Vec<AttendanceRecord>) -> Result<Update<T>, E> + Send,
        T: Send,
        E: Send,
    {
        self.deref().update(apply)
    }
}

/// What an [RecordStore::update] closure hands back: the value for the caller plus whether
/// the collection changed and needs to be written.
pub struct Update<T> {
    value: T,
    dirty: bool,
}

impl<T> Update<T> {
    pub fn changed(value: T) -> Self {
        Self { value, dirty: true }
    }

    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }
}

/// The main realization of [RecordStore]. Keeps the whole collection in one pretty-printed
/// JSON file so the data stays inspectable with a plain text editor.
///
/// Writes land through an atomic rename and every access goes through an advisory lock on
/// a sidecar file. The lock can not live on the data file itself since the rename would
/// swap the locked inode out from under a waiting process.
pub struct JsonFileStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

const DATA_FILE: &str = "attendance.json";
const LOCK_FILE: &str = "attendance.json.lock";

impl JsonFileStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            data_path: data_dir.join(DATA_FILE),
            lock_path: data_dir.join(LOCK_FILE),
        })
    }

    async fn load_inner(&self) -> Result<Vec<AttendanceRecord>> {
        let contents = match tokio::fs::read_to_string(&self.data_path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // The first access bootstraps an empty collection so readers and manual
                // inspection find a real file afterwards.
                debug!("Initializing empty collection at {:?}", self.data_path);
                self.persist(&[]).await?;
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };
        let records = serde_json::from_str(&contents)?;
        Ok(records)
    }

    async fn persist(&self, records: &[AttendanceRecord]) -> Result<()> {
        let body = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.data_path, &body).await?;
        Ok(())
    }

    async fn update_inner<T, E, F>(&self, apply: F) -> Result<Result<T, E>>
    where
        F: FnOnce(&mut Vec<AttendanceRecord>) -> Result<Update<T>, E>,
    {
        let mut records = self.load_inner().await?;
        match apply(&mut records) {
            Ok(Update { value, dirty }) => {
                if dirty {
                    self.persist(&records).await?;
                }
                Ok(Ok(value))
            }
            Err(rejected) => Ok(Err(rejected)),
        }
    }

    /// Locks the sidecar file. flock can wait on another process for a while, which must
    /// not park an executor thread, so the call moves onto the blocking pool.
    async fn lock_sidecar(&self, lock: fn(&File) -> std::io::Result<()>) -> Result<File> {
        let file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.lock_path)
            .await?;

        let file = tokio::task::spawn_blocking(move || {
            lock(&file)?;
            Ok::<_, std::io::Error>(file)
        })
        .await??;
        Ok(file)
    }
}

impl RecordStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<AttendanceRecord>> {
        let lock = self.lock_sidecar(|file| file.lock_shared()).await?;
        let result = self.load_inner().await;
        lock.unlock_async().await?;
        result
    }

    async fn save_all(&self, records: &[AttendanceRecord]) -> Result<()> {
        let lock = self.lock_sidecar(|file| file.lock_exclusive()).await?;
        let result = self.persist(records).await;
        lock.unlock_async().await?;
        result
    }

    async fn update<T, E, F>(&self, apply: F) -> Result<Result<T, E>>
    where
        F: FnOnce(&mut Vec<AttendanceRecord>) -> Result<Update<T>, E> + Send,
        T: Send,
        E: Send,
    {
        let lock = self.lock_sidecar(|file| file.lock_exclusive()).await?;
        let result = self.update_inner(apply).await;
        lock.unlock_async().await?;
        result
    }
}
