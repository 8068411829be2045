//! Image format detection.

use alloc::boxed::Box;

use crate::bmp::BmpDecoder;
use crate::{ImageDecoder, ResourceLimits};

/// Image formats with an incremental decoder.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Windows bitmap, 1 bit per pixel, uncompressed.
    Bmp,
}

impl ImageFormat {
    /// Detect format from magic bytes. Returns `None` if unrecognized.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // BMP: "BM"
        if data.len() >= 2 && data[..2] == *b"BM" {
            return Some(ImageFormat::Bmp);
        }

        None
    }

    /// Detect format from file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        // Manual case-insensitive comparison without std.
        let mut buf = [0u8; 8];
        let ext_bytes = ext.as_bytes();
        if ext_bytes.len() > buf.len() {
            return None;
        }
        for (i, &b) in ext_bytes.iter().enumerate() {
            buf[i] = b.to_ascii_lowercase();
        }
        let lower = &buf[..ext_bytes.len()];

        match lower {
            b"bmp" | b"dib" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Common file extensions.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Bmp => &["bmp", "dib"],
        }
    }

    /// Bytes needed before the decoder can validate the signature.
    pub fn min_probe_bytes(self) -> usize {
        match self {
            ImageFormat::Bmp => 14, // file header
        }
    }

    /// Create a fresh incremental decoder for this format.
    pub fn decoder(self, limits: ResourceLimits) -> Box<dyn ImageDecoder> {
        match self {
            ImageFormat::Bmp => Box::new(BmpDecoder::new().with_limits(limits)),
        }
    }
}

impl core::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ImageFormat::Bmp => "BMP",
        })
    }
}
