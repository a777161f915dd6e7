/*
 *  normalize.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  Upload normalization: orient and letterbox to the panel aspect
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

use image::error::{LimitError, LimitErrorKind};
use image::{imageops, DynamicImage, GenericImageView, ImageError, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::constants::{PANEL_HEIGHT, PANEL_WIDTH};
use crate::error::{FrameError, FrameResult};

const PAD_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Canvas geometry for one source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Result of normalizing one upload
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: DynamicImage,
    /// Source was portrait and got turned a quarter clockwise
    pub rotated: bool,
    pub padding: Padding,
}

/// Pads arbitrary images out to the panel's aspect ratio.
///
/// Source pixels are never scaled or cropped; only a white border is added.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    panel_width: u32,
    panel_height: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT)
    }
}

impl Normalizer {
    pub fn new(panel_width: u32, panel_height: u32) -> Self {
        Self { panel_width: panel_width.max(1), panel_height: panel_height.max(1) }
    }

    #[inline]
    pub fn target_aspect(&self) -> f64 {
        self.panel_width as f64 / self.panel_height as f64
    }

    /// Compute the padded canvas for a `width` x `height` source.
    pub fn padding_for(&self, width: u32, height: u32) -> Padding {
        let target = self.target_aspect();
        let src_aspect = width as f64 / height as f64;

        let (canvas_width, canvas_height) = if src_aspect > target {
            // too wide: keep width, pad top and bottom
            (width, ((width as f64 / target).round() as u32).max(height))
        } else {
            // too tall (or exact): keep height, pad left and right
            (((height as f64 * target).round() as u32).max(width), height)
        };

        Padding {
            canvas_width,
            canvas_height,
            offset_x: (canvas_width - width) / 2,
            offset_y: (canvas_height - height) / 2,
        }
    }

    /// Decode `raw`, rotate portrait captures, and letterbox onto a white canvas.
    pub fn normalize(&self, raw: &[u8]) -> FrameResult<NormalizedImage> {
        let decoded = image::load_from_memory(raw).map_err(FrameError::Decode)?;
        let (w, h) = decoded.dimensions();
        if w == 0 || h == 0 {
            return Err(FrameError::Decode(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::DimensionError,
            ))));
        }

        // pixel-dimension heuristic only, EXIF orientation is not consulted
        let rotated = w < h;
        let source = if rotated { decoded.rotate90() } else { decoded };
        let (w, h) = source.dimensions();

        let padding = self.padding_for(w, h);
        let mut canvas = RgbaImage::from_pixel(padding.canvas_width, padding.canvas_height, PAD_COLOR);
        imageops::replace(&mut canvas, &source.to_rgba8(), padding.offset_x as i64, padding.offset_y as i64);

        Ok(NormalizedImage { image: DynamicImage::ImageRgba8(canvas), rotated, padding })
    }
}

/// Encode a normalized image for the picture store.
///
/// Formats without an alpha channel get an RGB copy of the canvas.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> FrameResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg | ImageFormat::Pnm => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut out, format)
        }
        _ => image.write_to(&mut out, format),
    }
    .map_err(FrameError::Encode)?;
    Ok(out.into_inner())
}
