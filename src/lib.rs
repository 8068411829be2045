//! Chunk-fed incremental image decoding for memory-constrained targets.
//!
//! Bytes arrive from a transport in arbitrary chunks. A session copies them
//! into a small fixed-capacity [`TransferBuffer`], lets a resumable
//! [`ImageDecoder`] consume whatever is resident, and paints the result
//! through a scaling [`Rasterizer`] onto a caller-owned [`Canvas`]. The
//! whole file is never held in memory.
//!
//! - [`DecodeSession`] / [`StreamStatus`] — the driver loop
//! - [`SessionConfig`] — buffer size, format, limits
//! - [`TransferBuffer`] — bounded byte arena with compaction
//! - [`ImageDecoder`] / [`DecodeTarget`] / [`DecodeState`] — decode contract
//! - [`BmpDecoder`] — 1-bit uncompressed BMP
//! - [`Rasterizer`] / [`Scale`] — nearest-neighbour placement onto a canvas
//! - [`Canvas`] / [`PixelCanvas`] — destination storage
//! - [`ImageFormat`] / [`ImageInfo`] / [`ResourceLimits`] — metadata and limits
//!
//! ```
//! use zenstream::{DecodeSession, ImageFormat, PixelCanvas, SessionConfig, StreamStatus, Unstoppable};
//!
//! # fn fetch() -> Vec<Vec<u8>> { Vec::new() }
//! let config = SessionConfig::new(ImageFormat::Bmp).with_buffer_size(1024);
//! let mut session = DecodeSession::new(&config, PixelCanvas::fixed(200, 200))?;
//! for chunk in fetch() {
//!     if session.feed(&chunk, &Unstoppable)? == StreamStatus::Complete {
//!         break;
//!     }
//! }
//! # Ok::<(), zenstream::DecodeError>(())
//! ```
//!
//! Logging goes through the [`log`] facade; no logger is installed.

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod bmp;
mod buffer;
mod canvas;
mod config;
mod error;
mod format;
mod info;
mod limits;
mod raster;
mod session;
mod traits;

pub use bmp::BmpDecoder;
pub use buffer::{BufferError, TransferBuffer};
pub use canvas::{COLOR_OFF, COLOR_ON, Canvas, CanvasSize, Color, PixelCanvas};
pub use config::{
    ConfigError, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE, SessionConfig,
};
pub use error::DecodeError;
pub use format::ImageFormat;
pub use info::ImageInfo;
pub use limits::{LimitExceeded, ResourceLimits};
pub use raster::{Rasterizer, Scale};
pub use session::{DecodeSession, StreamStatus};
pub use traits::{DecodeState, DecodeTarget, ImageDecoder};

// Re-exports for decoder implementors and hosts.
pub use enough::{Stop, StopReason, Unstoppable};
pub use imgref::{ImgRef, ImgVec};
pub use rgb;
pub use rgb::Rgba;
