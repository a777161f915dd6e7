//! This module contains global constants and defaults shared across the frame.

/// Native width of the attached panel in pixels.
pub const PANEL_WIDTH: u32 = 800;
/// Native height of the attached panel in pixels.
pub const PANEL_HEIGHT: u32 = 480;

/// Default directory served as static content.
pub const DEFAULT_STATIC_DIR: &str = "./static";
/// Default picture store, one file per picture.
pub const DEFAULT_PICTURES_DIR: &str = "./static/pictures";
/// Display state file name, kept next to (not inside) the static root.
pub const STATE_FILE_NAME: &str = ".picframe-state.json";

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Uploads larger than this are refused by the HTTP layer.
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 10 << 20; // 10 MiB

// rotation defaults
pub const DEFAULT_ACTIVE_START_HOUR: u32 = 8;
pub const DEFAULT_ACTIVE_END_HOUR: u32 = 20;
pub const DEFAULT_ROTATION_INTERVAL_MINS: u32 = 120;
pub const DEFAULT_POLL_SECS: u64 = 600; // coarse wake, not tied to the interval

// renderer defaults
pub const DEFAULT_RENDERER_PROGRAM: &str = "python3";
pub const DEFAULT_RENDERER_SCRIPT: &str = "./static/image.py";
/// Placeholder substituted with the absolute picture path in renderer args.
pub const RENDERER_PATH_PLACEHOLDER: &str = "{path}";

/// Extension appended when an upload name carries no writable image format.
pub const FALLBACK_EXTENSION: &str = "png";
