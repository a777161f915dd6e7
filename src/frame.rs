/*
 *  frame.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Picture frame facade - list, ingest, remove and display-now
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

use image::ImageFormat;
use log::info;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::{Catalog, Snapshot};
use crate::constants::FALLBACK_EXTENSION;
use crate::display_state::{DisplayState, Selection};
use crate::error::{FrameError, FrameResult};
use crate::normalize::{self, Normalizer};
use crate::renderer::{Renderer, RendererGateway};

/// Reduce a caller-supplied name to a safe base name inside the store.
pub fn sanitize_name(name: &str) -> FrameResult<String> {
    // accept both separators, uploads from Windows browsers carry full paths
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base.starts_with('.') {
        return Err(FrameError::InvalidName(name.to_string()));
    }
    Ok(base.to_string())
}

/// Name and format under which an upload is stored.
fn storage_target(name: &str) -> (String, ImageFormat) {
    match ImageFormat::from_path(Path::new(name)) {
        Ok(format) if format.writing_enabled() => (name.to_string(), format),
        _ => (format!("{}.{}", name, FALLBACK_EXTENSION), ImageFormat::Png),
    }
}

/// Everything the request layer needs, shared by handlers and the scheduler.
#[derive(Debug, Clone)]
pub struct PictureFrame {
    catalog: Arc<Catalog>,
    state: Arc<DisplayState>,
    gateway: Arc<RendererGateway>,
    normalizer: Normalizer,
}

impl PictureFrame {
    pub fn new(state: Arc<DisplayState>, renderer: Arc<dyn Renderer>, normalizer: Normalizer) -> Self {
        let catalog = Arc::clone(state.catalog());
        let gateway = Arc::new(RendererGateway::new(Arc::clone(&catalog), renderer));
        Self { catalog, state, gateway, normalizer }
    }

    pub fn catalog(&self) -> &Arc<Catalog> { &self.catalog }
    pub fn state(&self) -> &Arc<DisplayState> { &self.state }
    pub fn gateway(&self) -> &Arc<RendererGateway> { &self.gateway }

    /// Fresh listing of the store.
    pub fn list(&self) -> FrameResult<Snapshot> {
        self.catalog.refresh()
    }

    /// Normalize `raw` and store it under a name derived from `suggested_name`.
    ///
    /// An existing picture of the same name is replaced.
    pub fn ingest(&self, raw: &[u8], suggested_name: &str) -> FrameResult<String> {
        let name = sanitize_name(suggested_name)?;
        let normalized = self.normalizer.normalize(raw)?;
        let (identifier, format) = storage_target(&name);
        let bytes = normalize::encode(&normalized.image, format)?;

        fs::write(self.catalog.path_of(&identifier), bytes)?;
        self.catalog.refresh()?;
        info!(
            "Stored {} ({}x{}{})",
            identifier,
            normalized.padding.canvas_width,
            normalized.padding.canvas_height,
            if normalized.rotated { ", rotated" } else { "" }
        );
        Ok(identifier)
    }

    /// Delete a picture from the store, then drop the current index if it went stale.
    pub fn remove(&self, identifier: &str) -> FrameResult<()> {
        let name = sanitize_name(identifier)?;
        match fs::remove_file(self.catalog.path_of(&name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(FrameError::NotFound(name)),
            Err(e) => return Err(FrameError::Store(e)),
        }
        self.catalog.refresh()?;
        self.state.invalidate_if_stale();
        info!("Deleted {}", name);
        Ok(())
    }

    /// Put `identifier` on the panel now; it becomes current once rendered.
    ///
    /// Waits behind a render already in flight.
    pub async fn display_now(&self, identifier: &str) -> FrameResult<Selection> {
        let name = sanitize_name(identifier)?;
        self.catalog.refresh_async().await?;

        let state = &self.state;
        self.gateway
            .display_resolved(|| state.locate(&name), |shown| state.commit(shown, None))
            .await
    }

    /// Picture on the panel, if it still resolves.
    pub fn current(&self) -> Option<Selection> {
        self.state.current()
    }
}
