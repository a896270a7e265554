//! Background manager seam
//!
//! The replay watch/upload manager lives outside this crate. The lifecycle
//! only constructs it against a storage path, registers its file collection
//! for cross-thread access, and starts it.

use crate::error::{Result, UploaderError};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// Upload state of a managed replay file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    /// Waiting to be uploaded
    #[default]
    Pending,
    /// Upload in progress
    InProgress,
    /// Uploaded successfully
    Uploaded,
    /// Upload failed
    Failed,
}

/// A replay file tracked by the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    /// Replay file on disk
    pub path: PathBuf,
    /// Current upload state
    pub status: UploadStatus,
}

/// Ordered collection mutated by background threads and read by the UI.
///
/// Until [`SyncCollection::enable_synchronization`] is called only the thread
/// that created the collection may mutate it.
#[derive(Debug)]
pub struct SyncCollection<T> {
    name: String,
    owner: ThreadId,
    synchronized: AtomicBool,
    items: RwLock<Vec<T>>,
}

impl<T: Clone> SyncCollection<T> {
    /// Create an empty collection owned by the current thread
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: thread::current().id(),
            synchronized: AtomicBool::new(false),
            items: RwLock::new(Vec::new()),
        }
    }

    /// Allow mutation from any thread
    pub fn enable_synchronization(&self) {
        self.synchronized.store(true, Ordering::SeqCst);
    }

    /// Whether cross-thread mutation has been enabled
    pub fn is_synchronized(&self) -> bool {
        self.synchronized.load(Ordering::SeqCst)
    }

    fn check_access(&self) -> Result<()> {
        if self.is_synchronized() || thread::current().id() == self.owner {
            Ok(())
        } else {
            Err(UploaderError::CollectionNotSynchronized(self.name.clone()))
        }
    }

    /// Append an item
    pub fn push(&self, item: T) -> Result<()> {
        self.check_access()?;
        self.items.write().push(item);
        Ok(())
    }

    /// Replace the item at `index`, returning whether it existed
    pub fn replace(&self, index: usize, item: T) -> Result<bool> {
        self.check_access()?;
        let mut items = self.items.write();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Snapshot of the items in order
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

/// Background file-monitoring/upload manager
pub trait Manager: Send + Sync {
    /// Files the manager is tracking
    fn files(&self) -> Arc<SyncCollection<ManagedFile>>;

    /// Begin watching and uploading
    fn start(&self) -> Result<()>;
}

/// Constructs the manager bound to its persisted item store
pub trait ManagerFactory: Send + Sync {
    /// Create a manager persisting its items at `storage_path`
    fn create(&self, storage_path: &Path) -> Result<Arc<dyn Manager>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> ManagedFile {
        ManagedFile {
            path: PathBuf::from(name),
            status: UploadStatus::Pending,
        }
    }

    #[test]
    fn test_owner_thread_may_mutate() {
        let files = SyncCollection::new("files");
        files.push(file("a.StormReplay")).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_foreign_thread_rejected_before_synchronization() {
        let files = Arc::new(SyncCollection::new("files"));
        let worker = Arc::clone(&files);

        let result = thread::spawn(move || worker.push(file("a.StormReplay")))
            .join()
            .unwrap();

        assert!(matches!(
            result,
            Err(UploaderError::CollectionNotSynchronized(name)) if name == "files"
        ));
        assert!(files.is_empty());
    }

    #[test]
    fn test_foreign_thread_allowed_after_synchronization() {
        let files = Arc::new(SyncCollection::new("files"));
        files.enable_synchronization();
        let worker = Arc::clone(&files);

        thread::spawn(move || {
            worker.push(file("a.StormReplay"))?;
            worker.replace(
                0,
                ManagedFile {
                    status: UploadStatus::Uploaded,
                    ..file("a.StormReplay")
                },
            )
        })
        .join()
        .unwrap()
        .unwrap();

        assert_eq!(files.snapshot()[0].status, UploadStatus::Uploaded);
    }
}
