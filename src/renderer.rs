/*
 *  renderer.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Renderer gateway - the only path to the physical panel
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

use log::{error, info};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::catalog::Catalog;
use crate::constants::RENDERER_PATH_PLACEHOLDER;
use crate::display_state::Selection;
use crate::error::{FrameError, FrameResult};

/// External rendering collaborator.
///
/// One synchronous, stateless call per picture: given an absolute path to a
/// ready-to-display image, put it on the panel or report why not. Calls may
/// block for seconds; the gateway keeps them off the async workers.
pub trait Renderer: Send + Sync + Debug {
    fn render(&self, path: &Path) -> FrameResult<()>;
}

/// Runs a configured program once per picture.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// `args` may contain `{path}`; otherwise the path is appended last.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(RENDERER_PATH_PLACEHOLDER, &path))
            .collect();
        if !self.args.iter().any(|a| a.contains(RENDERER_PATH_PLACEHOLDER)) {
            args.push(path.into_owned());
        }
        args
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, path: &Path) -> FrameResult<()> {
        let started = Instant::now();
        let output = Command::new(&self.program)
            .args(self.args_for(path))
            .output()
            .map_err(|e| FrameError::RenderUnavailable(format!("{}: {}", self.program, e)))?;

        if output.status.success() {
            info!("Renderer finished in {:?}", started.elapsed());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(FrameError::RenderFailed { status: output.status.to_string(), diagnostic })
    }
}

/// Shared state of a [`MockRenderer`], inspectable from tests
#[derive(Debug, Default)]
pub struct MockRendererState {
    /// Number of render() calls, successful or not
    pub calls: usize,

    /// Every path handed to render(), in order
    pub paths: Vec<PathBuf>,

    /// Renders currently running, and the most ever seen at once
    pub in_flight: usize,
    pub max_in_flight: usize,

    /// Time each render takes
    pub delay: Option<Duration>,

    /// Simulate failures (for error testing)
    pub simulate_failure: bool,
    pub simulate_unavailable: bool,
}

/// Renderer that records calls instead of driving hardware.
#[derive(Debug, Clone, Default)]
pub struct MockRenderer {
    state: Arc<Mutex<MockRendererState>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockRendererState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockRendererState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().paths.clone()
    }

    pub fn set_failure(&self, fail: bool) {
        self.lock().simulate_failure = fail;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().simulate_unavailable = unavailable;
    }
}

impl Renderer for MockRenderer {
    fn render(&self, path: &Path) -> FrameResult<()> {
        let (delay, fail, unavailable) = {
            let mut s = self.lock();
            s.calls += 1;
            s.paths.push(path.to_path_buf());
            s.in_flight += 1;
            s.max_in_flight = s.max_in_flight.max(s.in_flight);
            (s.delay, s.simulate_failure, s.simulate_unavailable)
        };
        if let Some(d) = delay {
            std::thread::sleep(d);
        }
        self.lock().in_flight -= 1;

        if unavailable {
            return Err(FrameError::RenderUnavailable("mock renderer offline".into()));
        }
        if fail {
            return Err(FrameError::RenderFailed { status: "exit status: 1".into(), diagnostic: "mock failure".into() });
        }
        Ok(())
    }
}

/// Serializes every render and resolves identifiers to absolute paths.
///
/// A request arriving while a render is in flight queues behind it.
#[derive(Debug)]
pub struct RendererGateway {
    catalog: Arc<Catalog>,
    renderer: Arc<dyn Renderer>,
    render_lock: tokio::sync::Mutex<()>,
}

impl RendererGateway {
    pub fn new(catalog: Arc<Catalog>, renderer: Arc<dyn Renderer>) -> Self {
        Self { catalog, renderer, render_lock: tokio::sync::Mutex::new(()) }
    }

    /// True while a render holds the panel.
    pub fn is_busy(&self) -> bool {
        self.render_lock.try_lock().is_err()
    }

    pub async fn display(&self, selection: &Selection) -> FrameResult<()> {
        self.display_then(selection, || ()).await
    }

    /// Render `selection`, then run `on_success` before releasing the panel,
    /// so state commits are ordered the same way renders are.
    pub async fn display_then<F>(&self, selection: &Selection, on_success: F) -> FrameResult<()>
    where
        F: FnOnce(),
    {
        let selection = selection.clone();
        self.display_resolved(move || Ok(selection), |_| on_success()).await.map(|_| ())
    }

    /// Take the panel, then pick what to show with `resolve`.
    ///
    /// `resolve` runs after any earlier render has committed, so it always
    /// sees the latest display state. `on_success` runs before the panel is
    /// released. Errors from `resolve` are returned without rendering.
    pub async fn display_resolved<R, C>(&self, resolve: R, on_success: C) -> FrameResult<Selection>
    where
        R: FnOnce() -> FrameResult<Selection>,
        C: FnOnce(&Selection),
    {
        let _panel = self.render_lock.lock().await;
        let selection = resolve()?;
        let path = self.catalog.path_of(&selection.identifier);

        if !path.is_file() {
            return Err(FrameError::NotFound(selection.identifier.clone()));
        }

        info!("Displaying picture: {}", path.display());
        let renderer = Arc::clone(&self.renderer);
        let render_path = path.clone();
        let result = tokio::task::spawn_blocking(move || renderer.render(&render_path))
            .await
            .map_err(|e| FrameError::RenderUnavailable(format!("render task failed: {}", e)))?;

        match result {
            Ok(()) => {
                on_success(&selection);
                Ok(selection)
            }
            Err(e) => {
                error!("Failed to display {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}
