/*
 *  display_state.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display state - which catalog entry is on the panel, and when we last rotated
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

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::catalog::{Catalog, Snapshot};
use crate::error::{FrameError, FrameResult};

/// A catalog entry resolved against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub index: usize,
    pub identifier: String,
}

/// What was last committed. Persisted as JSON when a state file is configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Committed {
    index: Option<usize>,
    identifier: Option<String>,
    last_rotation: Option<DateTime<Local>>,
}

impl Committed {
    /// Index validity is derived, never cached: the entry must still exist in
    /// `snapshot` at the same position under the same name.
    fn resolve(&self, snapshot: &Snapshot) -> Option<Selection> {
        let index = self.index?;
        let identifier = snapshot.get(index)?;
        match self.identifier.as_deref() {
            Some(expected) if expected != identifier => None,
            _ => Some(Selection { index, identifier: identifier.clone() }),
        }
    }
}

/// Single source of truth for the picture on the panel.
///
/// When the catalog shrinks or reorders underneath the committed index, the
/// state reports "no current picture" rather than clamping to a neighbour.
#[derive(Debug)]
pub struct DisplayState {
    catalog: Arc<Catalog>,
    inner: Mutex<Committed>,
    state_file: Option<PathBuf>,
}

impl DisplayState {
    /// Fresh, non-persistent state.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog, inner: Mutex::new(Committed::default()), state_file: None }
    }

    /// State persisted to `path`, seeded from it if readable.
    pub fn load(catalog: Arc<Catalog>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let committed = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Committed>(&s) {
                Ok(c) => {
                    info!("Restored display state from {}: {:?}", path.display(), c);
                    c
                }
                Err(e) => {
                    warn!("Ignoring corrupt display state {}: {}", path.display(), e);
                    Committed::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Committed::default(),
            Err(e) => {
                warn!("Ignoring unreadable display state {}: {}", path.display(), e);
                Committed::default()
            }
        };
        Self { catalog, inner: Mutex::new(committed), state_file: Some(path) }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, Committed> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The picture currently shown, if the committed index still resolves.
    pub fn current(&self) -> Option<Selection> {
        let committed = self.lock();
        committed.resolve(&self.catalog.snapshot())
    }

    pub fn last_rotation(&self) -> Option<DateTime<Local>> {
        self.lock().last_rotation
    }

    /// Validate `index` against the published catalog without committing.
    pub fn select(&self, index: usize) -> FrameResult<Selection> {
        let snapshot = self.catalog.snapshot();
        snapshot
            .get(index)
            .map(|identifier| Selection { index, identifier: identifier.clone() })
            .ok_or(FrameError::OutOfRange { index, len: snapshot.len() })
    }

    /// Find `identifier` in the published catalog. Index and name come from
    /// the same snapshot.
    pub fn locate(&self, identifier: &str) -> FrameResult<Selection> {
        let snapshot = self.catalog.snapshot();
        snapshot
            .iter()
            .position(|n| n == identifier)
            .map(|index| Selection { index, identifier: identifier.to_string() })
            .ok_or_else(|| FrameError::NotFound(identifier.to_string()))
    }

    /// Validate and commit `index`. Does not render.
    pub fn set_current(&self, index: usize) -> FrameResult<Selection> {
        let mut committed = self.lock();
        let selection = self.select(index)?;
        committed.index = Some(selection.index);
        committed.identifier = Some(selection.identifier.clone());
        self.persist(&committed);
        Ok(selection)
    }

    /// The entry after the current one, wrapping at the end. Nothing is committed.
    ///
    /// With no valid current picture the rotation restarts at index 0.
    pub fn advance(&self) -> FrameResult<Selection> {
        let committed = self.lock();
        let snapshot = self.catalog.snapshot();
        if snapshot.is_empty() {
            return Err(FrameError::EmptyCatalog);
        }
        let index = match committed.resolve(&snapshot) {
            Some(current) => (current.index + 1) % snapshot.len(),
            None => 0,
        };
        Ok(Selection { index, identifier: snapshot[index].clone() })
    }

    /// Record `selection` as shown. `rotated_at` also stamps the rotation clock.
    ///
    /// If the catalog was refreshed while the picture rendered, the index
    /// follows the identifier to its new position.
    pub fn commit(&self, selection: &Selection, rotated_at: Option<DateTime<Local>>) {
        let mut committed = self.lock();
        let snapshot = self.catalog.snapshot();
        let index = match snapshot.get(selection.index) {
            Some(name) if *name == selection.identifier => Some(selection.index),
            _ => snapshot.iter().position(|n| *n == selection.identifier),
        };
        committed.index = index;
        committed.identifier = index.map(|_| selection.identifier.clone());
        if rotated_at.is_some() {
            committed.last_rotation = rotated_at;
        }
        debug!("Committed picture {:?} ({})", index, selection.identifier);
        self.persist(&committed);
    }

    /// Drop a committed index that no longer resolves. Returns true if cleared.
    pub fn invalidate_if_stale(&self) -> bool {
        let mut committed = self.lock();
        if committed.index.is_none() || committed.resolve(&self.catalog.snapshot()).is_some() {
            return false;
        }
        info!("Current picture {:?} is gone; no current picture until next display", committed.identifier);
        committed.index = None;
        committed.identifier = None;
        self.persist(&committed);
        true
    }

    fn persist(&self, committed: &Committed) {
        let Some(path) = self.state_file.as_ref() else { return };
        if let Err(e) = write_state(path, committed) {
            warn!("Failed to persist display state to {}: {}", path.display(), e);
        }
    }
}

fn write_state(path: &Path, committed: &Committed) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(committed).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}
