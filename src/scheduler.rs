/*
 *  scheduler.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rotation scheduler - advances the frame inside the daily active window
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

use chrono::{DateTime, Local, TimeZone, Timelike};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::display_state::{DisplayState, Selection};
use crate::error::FrameError;
use crate::renderer::RendererGateway;

/// Daily window during which automatic rotation may happen.
///
/// Hours are local wall-clock and inclusive at both ends. A start later than
/// the end wraps past midnight (22..=6 covers the night).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationWindow {
    start_hour: u32,
    end_hour: u32,
    interval: chrono::Duration,
}

impl RotationWindow {
    pub fn new(start_hour: u32, end_hour: u32, interval: chrono::Duration) -> Self {
        Self { start_hour, end_hour, interval }
    }

    pub fn start_hour(&self) -> u32 { self.start_hour }
    pub fn end_hour(&self) -> u32 { self.end_hour }
    pub fn interval(&self) -> chrono::Duration { self.interval }

    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..=self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }

    pub fn is_active<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.contains_hour(now.hour())
    }

    /// Inside the window and at least one interval since the last rotation.
    pub fn is_due(&self, now: DateTime<Local>, last_rotation: Option<DateTime<Local>>) -> bool {
        self.is_active(&now) && last_rotation.is_none_or(|last| now - last >= self.interval)
    }
}

/// What one wake of the scheduler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    OutsideWindow,
    NotDue,
    EmptyCatalog,
    Rotated(Selection),
    /// Render or resolution failed; nothing committed, retried next wake
    Failed(String),
}

/// Background rotation loop over the shared display state.
#[derive(Debug, Clone)]
pub struct RotationScheduler {
    state: Arc<DisplayState>,
    gateway: Arc<RendererGateway>,
    window: RotationWindow,
    poll: Duration,
}

/// Handle to a running scheduler; dropping it also stops the loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_sender: mpsc::Sender<()>,
    poll_handle: JoinHandle<()>,
}

impl RotationScheduler {
    pub fn new(state: Arc<DisplayState>, gateway: Arc<RendererGateway>, window: RotationWindow, poll: Duration) -> Self {
        Self { state, gateway, window, poll }
    }

    /// One wake: rotate if due, committing only after the panel took the picture.
    pub async fn tick(&self, now: DateTime<Local>) -> TickOutcome {
        if !self.window.is_active(&now) {
            debug!("Rotation tick at {} outside active window", now.format("%H:%M"));
            return TickOutcome::OutsideWindow;
        }
        if !self.window.is_due(now, self.state.last_rotation()) {
            return TickOutcome::NotDue;
        }

        if let Err(e) = self.state.catalog().refresh_async().await {
            warn!("Rotation using previous catalog snapshot: {}", e);
        }

        // the next picture is picked with the panel held, after any manual
        // display ahead of us has committed
        let state = &self.state;
        match self.gateway.display_resolved(|| state.advance(), |next| state.commit(next, Some(now))).await {
            Ok(next) => {
                info!("Rotated to picture {} ({})", next.index, next.identifier);
                TickOutcome::Rotated(next)
            }
            Err(FrameError::EmptyCatalog) => {
                info!("No pictures to rotate, skipping tick");
                TickOutcome::EmptyCatalog
            }
            Err(e) => {
                error!("Rotation failed, will retry next wake: {}", e);
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Start the loop on the tokio runtime.
    ///
    /// A stop request is only observed between wakes, so an in-flight render
    /// always runs to completion.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_sender, mut stop_rx) = mpsc::channel(1);
        info!(
            "Rotation scheduler started: {:02}:00-{:02}:59 every {} min, polling every {:?}",
            self.window.start_hour, self.window.end_hour, self.window.interval.num_minutes(), self.poll
        );

        let poll_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll) => {
                        let outcome = self.tick(Local::now()).await;
                        debug!("Rotation tick: {:?}", outcome);
                    }
                    _ = stop_rx.recv() => {
                        info!("Rotation scheduler received stop signal. Exiting.");
                        break;
                    }
                }
            }
        });

        SchedulerHandle { stop_sender, poll_handle }
    }
}

impl SchedulerHandle {
    /// Ask the loop to exit and wait for the current wake to finish.
    pub async fn stop(self) {
        if let Err(e) = self.stop_sender.send(()).await {
            warn!("Rotation scheduler already gone: {}", e);
        }
        self.poll_handle
            .await
            .unwrap_or_else(|e| error!("Rotation scheduler task failed to join: {}", e));
        info!("Rotation scheduler stopped.");
    }

    pub fn is_finished(&self) -> bool {
        self.poll_handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::renderer::MockRenderer;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 6, 15, hour, minute, 0).unwrap()
    }

    struct Rig {
        _dir: TempDir,
        state: Arc<DisplayState>,
        mock: MockRenderer,
        scheduler: RotationScheduler,
    }

    fn rig(names: &[&str], window: RotationWindow, poll: Duration) -> Rig {
        let dir = tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let catalog = Arc::new(Catalog::open(dir.path()).unwrap());
        let state = Arc::new(DisplayState::new(Arc::clone(&catalog)));
        let mock = MockRenderer::new();
        let gateway = Arc::new(RendererGateway::new(catalog, Arc::new(mock.clone())));
        let scheduler = RotationScheduler::new(Arc::clone(&state), gateway, window, poll);
        Rig { _dir: dir, state, mock, scheduler }
    }

    fn daytime() -> RotationWindow {
        RotationWindow::new(8, 20, chrono::Duration::hours(2))
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let w = daytime();
        assert!(!w.contains_hour(7));
        assert!(w.contains_hour(8));
        assert!(w.contains_hour(20));
        assert!(!w.contains_hour(21));
    }

    #[test]
    fn test_window_wraps_midnight() {
        let w = RotationWindow::new(22, 6, chrono::Duration::hours(1));
        assert!(w.contains_hour(23));
        assert!(w.contains_hour(0));
        assert!(w.contains_hour(6));
        assert!(!w.contains_hour(12));
    }

    #[test]
    fn test_is_due_interval() {
        let w = daytime();
        assert!(w.is_due(at(9, 0), None));
        assert!(!w.is_due(at(10, 59), Some(at(9, 0))));
        assert!(w.is_due(at(11, 0), Some(at(9, 0))));
        assert!(!w.is_due(at(21, 0), Some(at(9, 0))));
    }

    #[tokio::test]
    async fn test_tick_rotates_and_commits() {
        let r = rig(&["a.png", "b.png"], daytime(), Duration::from_secs(600));

        assert_eq!(r.scheduler.tick(at(9, 0)).await, TickOutcome::Rotated(Selection { index: 0, identifier: "a.png".into() }));
        assert_eq!(r.state.last_rotation(), Some(at(9, 0)));

        // not due again until the interval has passed
        assert_eq!(r.scheduler.tick(at(10, 0)).await, TickOutcome::NotDue);
        assert_eq!(r.mock.calls(), 1);

        assert_eq!(r.scheduler.tick(at(11, 0)).await, TickOutcome::Rotated(Selection { index: 1, identifier: "b.png".into() }));
        assert_eq!(r.scheduler.tick(at(13, 0)).await, TickOutcome::Rotated(Selection { index: 0, identifier: "a.png".into() }));
    }

    #[tokio::test]
    async fn test_tick_outside_window_is_noop() {
        let r = rig(&["a.png"], daytime(), Duration::from_secs(600));
        assert_eq!(r.scheduler.tick(at(6, 30)).await, TickOutcome::OutsideWindow);
        assert_eq!(r.mock.calls(), 0);
        assert_eq!(r.state.current(), None);
    }

    #[tokio::test]
    async fn test_tick_empty_catalog_is_noop() {
        let r = rig(&[], daytime(), Duration::from_secs(600));
        assert_eq!(r.scheduler.tick(at(9, 0)).await, TickOutcome::EmptyCatalog);
        assert_eq!(r.mock.calls(), 0);
        assert_eq!(r.state.last_rotation(), None);
    }

    #[tokio::test]
    async fn test_tick_render_failure_commits_nothing() {
        let r = rig(&["a.png", "b.png"], daytime(), Duration::from_secs(600));
        r.state.set_current(0).unwrap();
        r.mock.set_failure(true);

        let outcome = r.scheduler.tick(at(9, 0)).await;
        assert!(matches!(outcome, TickOutcome::Failed(_)));
        assert_eq!(r.state.current().unwrap().index, 0);
        assert_eq!(r.state.last_rotation(), None);

        // renderer back: the very same transition is retried
        r.mock.set_failure(false);
        assert_eq!(r.scheduler.tick(at(9, 10)).await, TickOutcome::Rotated(Selection { index: 1, identifier: "b.png".into() }));
        assert_eq!(r.mock.paths().len(), 2);
        assert_eq!(r.mock.paths()[0], r.mock.paths()[1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tick_advances_from_manual_display_in_flight() {
        let r = rig(&["a.png", "b.png", "c.png", "d.png"], daytime(), Duration::from_secs(600));
        r.state.set_current(0).unwrap();
        r.mock.set_delay(Duration::from_millis(200));

        // a manual display of c.png holds the panel when the tick fires
        let manual = {
            let state = Arc::clone(&r.state);
            let gateway = Arc::clone(&r.scheduler.gateway);
            tokio::spawn(async move {
                let st = &state;
                gateway.display_resolved(|| st.locate("c.png"), |shown| st.commit(shown, None)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let outcome = r.scheduler.tick(at(9, 0)).await;
        assert_eq!(manual.await.unwrap().unwrap().index, 2);
        assert_eq!(outcome, TickOutcome::Rotated(Selection { index: 3, identifier: "d.png".into() }));
        assert_eq!(r.state.current(), Some(Selection { index: 3, identifier: "d.png".into() }));
        assert_eq!(r.state.last_rotation(), Some(at(9, 0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawned_loop_rotates_and_stops() {
        let always = RotationWindow::new(0, 23, chrono::Duration::zero());
        let r = rig(&["a.png", "b.png", "c.png"], always, Duration::from_millis(10));

        let handle = r.scheduler.spawn();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!handle.is_finished());
        handle.stop().await;

        let calls = r.mock.calls();
        assert!(calls >= 2, "expected several rotations, got {}", calls);
        assert!(r.state.current().is_some());

        // nothing runs after stop
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(r.mock.calls(), calls);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_inflight_render() {
        let always = RotationWindow::new(0, 23, chrono::Duration::zero());
        let r = rig(&["a.png"], always, Duration::from_millis(5));
        r.mock.set_delay(Duration::from_millis(150));

        let handle = r.scheduler.spawn();
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await;

        let state = r.mock.state();
        let s = state.lock().unwrap();
        assert_eq!(s.in_flight, 0);
        assert!(s.calls >= 1);
        drop(s);
        // the render that was running when stop arrived still got committed
        assert_eq!(r.state.current().map(|c| c.index), Some(0));
    }
}
