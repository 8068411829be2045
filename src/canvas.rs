//! Destination canvas contract and an in-memory implementation.
//!
//! A [`Canvas`] owns pixel storage and its color model. The rasterizer only
//! ever asks it to [`resize`](Canvas::resize) once per session and to
//! [`draw_pixel`](Canvas::draw_pixel) inside the reported buffer bounds.
//!
//! [`PixelCanvas`] is a straightforward RGBA8 canvas backed by an
//! [`ImgVec`]. It either follows the image size ([`CanvasSize::Auto`]) or
//! keeps a fixed buffer size ([`CanvasSize::Fixed`]), in which case the
//! rasterizer scales the image into it.

use alloc::vec::Vec;

use imgref::{ImgRef, ImgVec};
use rgb::Rgba;

use crate::ResourceLimits;

/// Pixel color handed to a canvas.
pub type Color = Rgba<u8>;

/// Color for set bits in 1-bit images.
pub const COLOR_ON: Color = Rgba {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};

/// Color for clear bits in 1-bit images.
pub const COLOR_OFF: Color = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

/// Destination pixel storage.
///
/// Implementations must tolerate `draw_pixel` calls outside
/// `[0, buffer_width) × [0, buffer_height)` by ignoring them.
pub trait Canvas {
    /// Allocate storage for an image of `width × height` pixels.
    ///
    /// The canvas may choose a different buffer size (fixed-size canvases
    /// do); report it through [`buffer_width`](Canvas::buffer_width) and
    /// [`buffer_height`](Canvas::buffer_height). Returns `false` if the
    /// storage could not be allocated.
    fn resize(&mut self, width: u32, height: u32) -> bool;

    /// Set one pixel. Out-of-range coordinates are ignored.
    fn draw_pixel(&mut self, x: u32, y: u32, color: Color);

    /// Current buffer width in pixels.
    fn buffer_width(&self) -> u32;

    /// Current buffer height in pixels.
    fn buffer_height(&self) -> u32;
}

impl<C: Canvas + ?Sized> Canvas for &mut C {
    fn resize(&mut self, width: u32, height: u32) -> bool {
        (**self).resize(width, height)
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Color) {
        (**self).draw_pixel(x, y, color)
    }

    fn buffer_width(&self) -> u32 {
        (**self).buffer_width()
    }

    fn buffer_height(&self) -> u32 {
        (**self).buffer_height()
    }
}

/// How a [`PixelCanvas`] picks its buffer size on [`resize`](Canvas::resize).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanvasSize {
    /// Buffer matches the requested image size.
    #[default]
    Auto,
    /// Buffer is always `width × height`; images are scaled into it.
    Fixed {
        /// Buffer width in pixels.
        width: u32,
        /// Buffer height in pixels.
        height: u32,
    },
}

/// In-memory RGBA8 canvas.
///
/// Freshly allocated pixels are [`COLOR_OFF`].
#[derive(Clone, Debug, Default)]
pub struct PixelCanvas {
    size: CanvasSize,
    limits: ResourceLimits,
    pixels: Option<ImgVec<Color>>,
}

impl PixelCanvas {
    /// Canvas whose buffer follows the image size.
    ///
    /// The size comes from untrusted header bytes and nothing bounds it by
    /// default. Fallible allocation only catches refusals; a host that
    /// overcommits memory may hand out a multi-gigabyte buffer that is then
    /// zero-filled. Set a budget with [`with_limits`](Self::with_limits)
    /// (`max_memory_bytes` or `max_pixels`) when the input is not trusted.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Canvas with a fixed `width × height` buffer.
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            size: CanvasSize::Fixed { width, height },
            ..Self::default()
        }
    }

    /// Refuse buffers that exceed `limits`.
    ///
    /// `max_width`, `max_height` and `max_pixels` apply to the buffer size;
    /// `max_memory_bytes` to its byte size (4 bytes per pixel).
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sizing policy.
    pub fn size_policy(&self) -> CanvasSize {
        self.size
    }

    /// Whether a buffer is currently allocated.
    pub fn is_allocated(&self) -> bool {
        self.pixels.is_some()
    }

    /// Color at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let img = self.pixels.as_ref()?;
        let (x, y) = (x as usize, y as usize);
        if x >= img.width() || y >= img.height() {
            return None;
        }
        img.buf().get(y * img.stride() + x).copied()
    }

    /// Borrow the pixel buffer, if allocated.
    pub fn as_img(&self) -> Option<ImgRef<'_, Color>> {
        self.pixels.as_ref().map(|img| img.as_ref())
    }

    /// Free the pixel buffer.
    pub fn release(&mut self) {
        self.pixels = None;
    }

    fn allocate(&self, width: u32, height: u32) -> Option<ImgVec<Color>> {
        if let Err(err) = self.limits.check_dimensions(width, height) {
            log::warn!("canvas {width}x{height} rejected: {err}");
            return None;
        }
        let pixels = width as u64 * height as u64;
        if let Err(err) = self.limits.check_memory(pixels.saturating_mul(4)) {
            log::warn!("canvas {width}x{height} rejected: {err}");
            return None;
        }
        let len = usize::try_from(pixels).ok()?;
        let mut buf = Vec::new();
        if buf.try_reserve_exact(len).is_err() {
            log::error!("failed to allocate {width}x{height} canvas");
            return None;
        }
        buf.resize(len, COLOR_OFF);
        Some(ImgVec::new(buf, width as usize, height as usize))
    }
}

impl Canvas for PixelCanvas {
    fn resize(&mut self, width: u32, height: u32) -> bool {
        let (width, height) = match self.size {
            CanvasSize::Auto => (width, height),
            CanvasSize::Fixed { width, height } => (width, height),
        };
        self.pixels = None;
        if width == 0 || height == 0 {
            return true;
        }
        self.pixels = self.allocate(width, height);
        self.pixels.is_some()
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Color) {
        let Some(img) = self.pixels.as_mut() else {
            log::warn!("draw at ({x},{y}) on unallocated canvas");
            return;
        };
        let (x, y) = (x as usize, y as usize);
        if x >= img.width() || y >= img.height() {
            log::warn!("draw at ({x},{y}) outside {}x{} canvas", img.width(), img.height());
            return;
        }
        let stride = img.stride();
        img.buf_mut()[y * stride + x] = color;
    }

    fn buffer_width(&self) -> u32 {
        self.pixels.as_ref().map_or(0, |img| img.width() as u32)
    }

    fn buffer_height(&self) -> u32 {
        self.pixels.as_ref().map_or(0, |img| img.height() as u32)
    }
}
