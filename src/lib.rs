/*
 *  lib.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
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

//! Display-state controller for a slideshow picture frame.
//!
//! A directory of pictures is the catalog; one index says which picture is on
//! the panel; a background scheduler rotates through the catalog during the
//! day, and every physical update goes through a single renderer gateway.
//!
//! ## Components
//!
//! 1. **Normalizer** (`normalize.rs`) - orient and letterbox uploads
//! 2. **Catalog** (`catalog.rs`) - published snapshot of the picture directory
//! 3. **Display state** (`display_state.rs`) - current index, rotation clock
//! 4. **Renderer gateway** (`renderer.rs`) - serialized external renders
//! 5. **Scheduler** (`scheduler.rs`) - cancellable rotation loop
//!
//! `frame.rs` ties them into the list/ingest/remove/display-now operations
//! and `http.rs` exposes those over HTTP.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod display_state;
pub mod error;
pub mod frame;
pub mod http;
pub mod normalize;
pub mod renderer;
pub mod scheduler;

// Re-exports for convenience
pub use catalog::{Catalog, Snapshot};
pub use display_state::{DisplayState, Selection};
pub use error::{FrameError, FrameResult};
pub use frame::PictureFrame;
pub use normalize::{Normalizer, NormalizedImage, Padding};
pub use renderer::{CommandRenderer, MockRenderer, Renderer, RendererGateway};
pub use scheduler::{RotationScheduler, RotationWindow, SchedulerHandle, TickOutcome};
