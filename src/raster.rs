//! Scaling rasterizer.
//!
//! [`Rasterizer`] is the shared [`DecodeTarget`] implementation. It owns
//! the canvas for the duration of a session and maps source-image
//! rectangles onto canvas pixels with independent x/y scale factors:
//!
//! ```text
//! dst_x0 = floor(x * x_scale)
//! dst_x1 = min(buffer_width, ceil((x + w) * x_scale))
//! ```
//!
//! and the same for y. Each source pixel covers zero, one or many canvas
//! pixels (nearest neighbour). When minifying, several source pixels land
//! on the same canvas pixel and the last one painted wins, so decoders
//! paint in source raster order.
//!
//! The canvas dimensions are derived from untrusted header bytes. Every
//! destination coordinate is clamped to `[0, buffer_width) × [0, buffer_height)`
//! before the canvas sees it, whatever the scale.

use core::ops::Range;

use crate::{Canvas, Color, DecodeError, DecodeTarget};

/// Source-to-canvas scale factors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    /// `buffer_width / image_width`.
    pub x: f64,
    /// `buffer_height / image_height`.
    pub y: f64,
}

impl Scale {
    /// Scale factors mapping a `requested_width × requested_height` image
    /// onto a `buffer_width × buffer_height` canvas.
    ///
    /// A zero requested dimension yields a zero factor on that axis, so
    /// nothing maps onto the canvas.
    pub fn new(
        buffer_width: u32,
        buffer_height: u32,
        requested_width: u32,
        requested_height: u32,
    ) -> Self {
        Self {
            x: ratio(buffer_width, requested_width),
            y: ratio(buffer_height, requested_height),
        }
    }

    /// Identity scale.
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
}

fn ratio(buffer: u32, requested: u32) -> f64 {
    if requested == 0 {
        0.0
    } else {
        buffer as f64 / requested as f64
    }
}

// `f64::floor`/`ceil` need std; coordinates are never negative here.
fn floor_index(v: f64) -> u64 {
    if v.is_nan() || v <= 0.0 { 0 } else { v as u64 }
}

fn ceil_index(v: f64) -> u64 {
    let t = floor_index(v);
    if (t as f64) < v { t.saturating_add(1) } else { t }
}

/// Destination span for source span `[start, start + len)` along one axis.
fn span(start: u32, len: u32, scale: f64, limit: u32) -> Range<u32> {
    let limit = limit as u64;
    let lo = floor_index(start as f64 * scale).min(limit);
    let hi = ceil_index((start as u64 + len as u64) as f64 * scale).min(limit);
    // Both bounds are <= limit, which came from a u32.
    lo as u32..hi as u32
}

/// Maps decoder output onto a [`Canvas`].
#[derive(Debug)]
pub struct Rasterizer<C> {
    canvas: C,
    scale: Option<Scale>,
    requested: Option<(u32, u32)>,
}

impl<C: Canvas> Rasterizer<C> {
    /// Wrap `canvas`. It is resized on the first
    /// [`request_canvas()`](DecodeTarget::request_canvas).
    pub fn new(canvas: C) -> Self {
        Self {
            canvas,
            scale: None,
            requested: None,
        }
    }

    /// Scale factors, once the canvas has been requested.
    pub fn scale(&self) -> Option<Scale> {
        self.scale
    }

    /// Image size passed to the successful `request_canvas()` call.
    pub fn requested_size(&self) -> Option<(u32, u32)> {
        self.requested
    }

    /// Borrow the canvas.
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Give back the canvas.
    pub fn into_canvas(self) -> C {
        self.canvas
    }
}

impl<C: Canvas> DecodeTarget for Rasterizer<C> {
    fn request_canvas(&mut self, width: u32, height: u32) -> Result<(), DecodeError> {
        if let Some((w, h)) = self.requested {
            log::warn!("canvas already sized for {w}x{h}, ignoring request for {width}x{height}");
            return Ok(());
        }
        if !self.canvas.resize(width, height) {
            log::error!("canvas allocation for {width}x{height} failed");
            return Err(DecodeError::OutOfMemory { width, height });
        }
        let scale = Scale::new(
            self.canvas.buffer_width(),
            self.canvas.buffer_height(),
            width,
            height,
        );
        log::debug!(
            "canvas {}x{} for {width}x{height} image, scale {:.4}x{:.4}",
            self.canvas.buffer_width(),
            self.canvas.buffer_height(),
            scale.x,
            scale.y
        );
        self.scale = Some(scale);
        self.requested = Some((width, height));
        Ok(())
    }

    fn paint_block(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        let Some(scale) = self.scale else {
            log::warn!("paint at ({x},{y}) before the canvas was sized");
            return;
        };
        let xs = span(x, w, scale.x, self.canvas.buffer_width());
        let ys = span(y, h, scale.y, self.canvas.buffer_height());
        for dy in ys {
            for dx in xs.clone() {
                self.canvas.draw_pixel(dx, dy, color);
            }
        }
    }
}
