/*
 *  catalog.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Picture catalog - a published snapshot of the picture store listing
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{FrameError, FrameResult};

/// One immutable listing of the picture store, sorted by file name.
pub type Snapshot = Arc<Vec<String>>;

/// Derived cache of the picture directory.
///
/// The filesystem is the only source of truth: pictures are added or removed
/// by touching files and then calling [`Catalog::refresh`]. Readers always get
/// a whole snapshot, either the one before a refresh or the one after.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    published: RwLock<Snapshot>,
}

impl Catalog {
    /// Catalog over `root` with an empty snapshot. Does not touch the disk.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root, published: RwLock::new(Arc::new(Vec::new())) }
    }

    /// Create the store directory if needed and load the first snapshot.
    pub fn open(root: impl AsRef<Path>) -> FrameResult<Self> {
        fs::create_dir_all(root.as_ref())?;
        let root = fs::canonicalize(root.as_ref())?;
        let catalog = Self::new(root);
        catalog.refresh()?;
        Ok(catalog)
    }

    /// Absolute path of the picture store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for an identifier (no existence check).
    pub fn path_of(&self, identifier: &str) -> PathBuf {
        self.root.join(identifier)
    }

    /// Re-list the store and publish the result.
    ///
    /// On failure the previous snapshot stays published.
    pub fn refresh(&self) -> FrameResult<Snapshot> {
        let read_err = |source| FrameError::CatalogRead { path: self.root.clone(), source };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            if entry.file_type().map_err(read_err)?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 picture name {:?}", raw),
            }
        }
        names.sort();

        let snapshot: Snapshot = Arc::new(names);
        *self.published.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&snapshot);
        debug!("Catalog refreshed: {} pictures", snapshot.len());
        Ok(snapshot)
    }

    /// [`Catalog::refresh`] on the blocking pool, for callers on async workers.
    pub async fn refresh_async(self: &Arc<Self>) -> FrameResult<Snapshot> {
        let catalog = Arc::clone(self);
        tokio::task::spawn_blocking(move || catalog.refresh())
            .await
            .map_err(|e| FrameError::Store(std::io::Error::other(e)))?
    }

    /// Currently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.published.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_refresh_lists_files_only_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.png"), b"x").unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::create_dir(dir.path().join("thumbs")).unwrap();

        let catalog = Catalog::open(dir.path()).unwrap();
        assert_eq!(*catalog.snapshot(), vec!["a.jpg".to_string(), "b.png".to_string()]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let dir = tempdir().unwrap();
        for name in ["z.png", "m.png", "a.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let catalog = Catalog::open(dir.path()).unwrap();
        let first = catalog.refresh().unwrap();
        let second = catalog.refresh().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("pictures");
        fs::create_dir(&store).unwrap();
        fs::write(store.join("one.png"), b"x").unwrap();

        let catalog = Catalog::new(&store);
        catalog.refresh().unwrap();
        fs::remove_dir_all(&store).unwrap();

        let err = catalog.refresh().unwrap_err();
        assert!(matches!(err, FrameError::CatalogRead { .. }));
        assert_eq!(*catalog.snapshot(), vec!["one.png".to_string()]);
    }

    #[test]
    fn test_snapshot_is_not_mutated_by_refresh() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.png"), b"x").unwrap();
        let catalog = Catalog::open(dir.path()).unwrap();

        let held = catalog.snapshot();
        fs::write(dir.path().join("two.png"), b"x").unwrap();
        catalog.refresh().unwrap();

        assert_eq!(held.len(), 1);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_paths_are_absolute() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::open(dir.path()).unwrap();
        assert!(catalog.root().is_absolute());
        assert!(catalog.path_of("x.png").is_absolute());
        assert!(catalog.path_of("x.png").ends_with("x.png"));
    }

    #[tokio::test]
    async fn test_refresh_async_publishes() {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::open(dir.path()).unwrap());
        fs::write(dir.path().join("new.png"), b"x").unwrap();

        let snapshot = catalog.refresh_async().await.unwrap();
        assert_eq!(*snapshot, vec!["new.png".to_string()]);
        assert_eq!(catalog.snapshot(), snapshot);
    }
}
