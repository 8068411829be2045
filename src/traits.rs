//! Incremental decode contract.
//!
//! Every format decoder implements [`ImageDecoder`]. A decoder never owns
//! the input or the output: it is handed whatever bytes are resident
//! right now, plus a [`DecodeTarget`] through which it sizes and paints
//! the destination.
//!
//! ```text
//! transport ─► TransferBuffer ─► ImageDecoder::decode ─► DecodeTarget ─► Canvas
//!                   ▲                     │
//!                   └──── consume(n) ◄────┘
//! ```
//!
//! # Contract
//!
//! - `data[0]` passed to [`decode()`](ImageDecoder::decode) is the stream
//!   byte at [`cursor()`](ImageDecoder::cursor). The return value is the
//!   number of bytes consumed from *this* call's slice; the driver must
//!   discard exactly that many before the next call.
//! - A decoder that cannot complete its current phase consumes nothing
//!   and changes no state, so calling again with a longer slice resumes
//!   cleanly.
//! - [`request_canvas()`](DecodeTarget::request_canvas) is called exactly
//!   once, before the first [`paint_block()`](DecodeTarget::paint_block).
//! - Errors are terminal. Later calls return the same error.

use crate::{Color, DecodeError, ImageFormat, ImageInfo};

/// Externally visible state of a decode session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeState {
    /// Signature or header bytes are still missing.
    AwaitingHeader,
    /// The canvas is sized; pixel data is being painted.
    AwaitingBody,
    /// All pixel data has been painted.
    Complete,
    /// Decoding failed; the session cannot continue.
    Failed(DecodeError),
}

impl DecodeState {
    /// Whether no further input can change the state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_))
    }
}

/// The two primitives a decoder uses to produce output.
///
/// Implemented by [`Rasterizer`](crate::Rasterizer). Object-safe so
/// decoders can take `&mut dyn DecodeTarget`.
pub trait DecodeTarget {
    /// Size the destination for a `width × height` image.
    ///
    /// Fixes the scale factors for the rest of the session.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfMemory`] if the canvas could not be allocated.
    fn request_canvas(&mut self, width: u32, height: u32) -> Result<(), DecodeError>;

    /// Fill the source-pixel rectangle `(x, y, w, h)` with `color`.
    fn paint_block(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color);
}

/// Resumable, chunk-fed image decoder.
///
/// # Example
///
/// ```
/// use zenstream::{BmpDecoder, ImageDecoder, PixelCanvas, Rasterizer};
///
/// let mut decoder = BmpDecoder::new();
/// let mut raster = Rasterizer::new(PixelCanvas::auto());
///
/// // Not enough bytes for the file header yet: nothing is consumed.
/// assert_eq!(decoder.decode(b"BM\x3e\x00", &mut raster).unwrap(), 0);
/// assert_eq!(decoder.cursor(), 0);
/// ```
pub trait ImageDecoder: Send {
    /// Format this decoder parses.
    fn format(&self) -> ImageFormat;

    /// Current state.
    fn state(&self) -> DecodeState;

    /// Absolute stream offset of the next byte the decoder expects.
    fn cursor(&self) -> u64;

    /// Minimum bytes the current phase needs before it can make progress.
    ///
    /// A driver whose buffer is smaller than this can never feed the
    /// decoder and should give up.
    fn bytes_needed(&self) -> usize;

    /// Header metadata, once the header phase has completed.
    fn info(&self) -> Option<&ImageInfo>;

    /// Process as many of the resident bytes in `data` as possible.
    ///
    /// Returns the number of bytes consumed from `data`.
    fn decode(&mut self, data: &[u8], target: &mut dyn DecodeTarget)
    -> Result<usize, DecodeError>;

    /// Whether the image has been fully decoded.
    fn is_finished(&self) -> bool {
        self.state() == DecodeState::Complete
    }
}
