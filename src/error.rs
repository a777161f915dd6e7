/*
 *  error.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the frame core
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

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all frame operations.
///
/// Every variant is recoverable at the operation boundary; none of them
/// should take the process down.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Upload could not be decoded as an image
    #[error("Image decode failed: {0}")]
    Decode(#[source] image::ImageError),

    /// Normalized image could not be encoded for storage
    #[error("Image encode failed: {0}")]
    Encode(#[source] image::ImageError),

    /// Backing pictures directory could not be listed
    #[error("Failed to read pictures directory {}: {source}", .path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Index outside the current catalog snapshot
    #[error("Index {index} out of range (catalog holds {len} pictures)")]
    OutOfRange { index: usize, len: usize },

    /// Nothing to show
    #[error("Catalog is empty")]
    EmptyCatalog,

    /// Identifier not present in the catalog
    #[error("Picture not found: {0}")]
    NotFound(String),

    /// Caller supplied a name we refuse to store or resolve
    #[error("Invalid picture name: {0:?}")]
    InvalidName(String),

    /// Filesystem write/delete failure in the picture store
    #[error("Picture store I/O error: {0}")]
    Store(#[from] std::io::Error),

    /// Renderer could not be started at all
    #[error("Renderer unavailable: {0}")]
    RenderUnavailable(String),

    /// Renderer ran but reported failure
    #[error("Renderer failed ({status}): {diagnostic}")]
    RenderFailed { status: String, diagnostic: String },
}

impl FrameError {
    /// True when the caller is at fault (bad upload, bad name, bad index)
    /// rather than the frame itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FrameError::Decode(_)
                | FrameError::OutOfRange { .. }
                | FrameError::EmptyCatalog
                | FrameError::NotFound(_)
                | FrameError::InvalidName(_)
        )
    }

    /// True for failures of the external rendering collaborator.
    pub fn is_render_error(&self) -> bool {
        matches!(self, FrameError::RenderUnavailable(_) | FrameError::RenderFailed { .. })
    }
}

pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(FrameError::EmptyCatalog.is_client_error());
        assert!(FrameError::NotFound("a.png".into()).is_client_error());
        assert!(FrameError::OutOfRange { index: 3, len: 2 }.is_client_error());

        let failed = FrameError::RenderFailed { status: "exit status: 1".into(), diagnostic: "boom".into() };
        assert!(!failed.is_client_error());
        assert!(failed.is_render_error());
        assert!(FrameError::RenderUnavailable("no such file".into()).is_render_error());

        let io = FrameError::from(std::io::Error::other("disk"));
        assert!(!io.is_client_error());
        assert!(!io.is_render_error());
    }

    #[test]
    fn test_error_messages() {
        let e = FrameError::OutOfRange { index: 5, len: 2 };
        assert_eq!(e.to_string(), "Index 5 out of range (catalog holds 2 pictures)");
        assert_eq!(FrameError::InvalidName("..".into()).to_string(), "Invalid picture name: \"..\"");
    }
}
