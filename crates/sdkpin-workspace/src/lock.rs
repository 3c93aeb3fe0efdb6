use crate::WorkspaceError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive advisory lock held while manifests are written back.
///
/// Released when dropped.
pub struct WorkspaceLock {
    lock_file: File,
}

impl WorkspaceLock {
    /// Take the lock without waiting. `Ok(None)` means another process holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, WorkspaceError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(WorkspaceError::LockFailed(format!(
                "{}: {e}",
                lock_path.display()
            ))),
        }
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File, WorkspaceError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("nested/test.lock");

        let lock = WorkspaceLock::try_acquire(&lock_path).unwrap();
        assert!(lock.is_some());
        assert!(lock_path.exists());
    }

    #[test]
    fn held_lock_is_reported_busy() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");

        let _held = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        assert!(WorkspaceLock::try_acquire(&lock_path).unwrap().is_none());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");

        {
            let _held = WorkspaceLock::try_acquire(&lock_path).unwrap().unwrap();
        }

        assert!(WorkspaceLock::try_acquire(&lock_path).unwrap().is_some());
    }
}
