//! Parsed image header metadata.

use crate::ImageFormat;

/// Header metadata reported by a decoder once its header phase completes.
///
/// Values are the raw, little-endian decoded header fields. They come from
/// untrusted input; check them with
/// [`ResourceLimits::check_image_info()`](crate::ResourceLimits::check_image_info)
/// before sizing anything from them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ImageInfo {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Detected image format.
    pub format: ImageFormat,
    /// Bits per pixel.
    pub bits_per_pixel: u16,
    /// Compression method code (0 = none).
    pub compression: u32,
    /// Total file size declared by the header, in bytes.
    pub file_size: u32,
    /// Offset of the first pixel byte from the start of the stream.
    pub data_offset: u32,
    /// Declared size of the pixel data in bytes (may be 0 for uncompressed data).
    pub image_data_size: u32,
    /// Number of color table entries declared by the header.
    pub color_table_entries: u32,
}

impl ImageInfo {
    /// Create a new `ImageInfo` with the given dimensions and format.
    ///
    /// Other fields default to zero. Use the `with_*` builder methods to
    /// set them.
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            width,
            height,
            format,
            bits_per_pixel: 0,
            compression: 0,
            file_size: 0,
            data_offset: 0,
            image_data_size: 0,
            color_table_entries: 0,
        }
    }

    /// Set the bits per pixel.
    pub fn with_bits_per_pixel(mut self, bits: u16) -> Self {
        self.bits_per_pixel = bits;
        self
    }

    /// Set the compression method code.
    pub fn with_compression(mut self, compression: u32) -> Self {
        self.compression = compression;
        self
    }

    /// Set the declared file size.
    pub fn with_file_size(mut self, bytes: u32) -> Self {
        self.file_size = bytes;
        self
    }

    /// Set the pixel data offset.
    pub fn with_data_offset(mut self, offset: u32) -> Self {
        self.data_offset = offset;
        self
    }

    /// Set the declared pixel data size.
    pub fn with_image_data_size(mut self, bytes: u32) -> Self {
        self.image_data_size = bytes;
        self
    }

    /// Set the number of color table entries.
    pub fn with_color_table_entries(mut self, entries: u32) -> Self {
        self.color_table_entries = entries;
        self
    }

    /// Total pixel count, computed without overflow.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Bytes per pixel row: `ceil(width * bits_per_pixel / 8)`.
    pub fn row_stride(&self) -> u64 {
        (self.width as u64 * self.bits_per_pixel as u64).div_ceil(8)
    }
}
