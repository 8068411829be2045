//! Incremental decoder for 1-bit uncompressed BMP.
//!
//! The decoder is a three-phase state machine driven by whatever bytes are
//! resident in the transfer buffer:
//!
//! | Phase     | Needs                          | Produces                       |
//! |-----------|--------------------------------|--------------------------------|
//! | Signature | 14 bytes                       | file size, pixel-data offset   |
//! | Header    | bytes up to pixel-data offset  | dimensions, canvas request     |
//! | Pixels    | 1 byte per step                | 8 painted pixels per byte      |
//!
//! A phase either completes and consumes its bytes, or consumes nothing,
//! so re-entering at the same cursor with more data is always safe.
//!
//! Pixel byte `p` (counted from the pixel-data offset) covers columns
//! `(p * 8) mod width + i` for bit `i`, most significant bit first, on row
//! `height - 1 - p / stride`, where `stride = ceil(width / 8)`. Rows are
//! stored bottom-up and are not padded.

use crate::{
    COLOR_OFF, COLOR_ON, DecodeError, DecodeState, DecodeTarget, ImageDecoder, ImageFormat,
    ImageInfo, ResourceLimits,
};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// File header: magic, file size, reserved, pixel-data offset.
const FILE_HEADER_LEN: usize = 14;

/// End of the last info-header field the decoder reads (color count).
const MIN_DATA_OFFSET: u32 = 50;

const SIGNATURE: &[u8; 2] = b"BM";

// Absolute stream offsets of the fields read.
const OFF_FILE_SIZE: usize = 2;
const OFF_DATA_OFFSET: usize = 10;
const OFF_WIDTH: usize = 18;
const OFF_HEIGHT: usize = 22;
const OFF_BPP: usize = 28;
const OFF_COMPRESSION: usize = 30;
const OFF_IMAGE_SIZE: usize = 34;
const OFF_COLORS_USED: usize = 46;

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Signature,
    Header,
    Pixels,
    Done,
}

/// Resumable 1-bit BMP decoder.
///
/// Feed it through [`ImageDecoder::decode`], or let a
/// [`DecodeSession`](crate::DecodeSession) drive it.
#[derive(Clone, Debug)]
pub struct BmpDecoder {
    limits: ResourceLimits,
    phase: Phase,
    failure: Option<DecodeError>,
    cursor: u64,
    file_size: u32,
    data_offset: u32,
    info: Option<ImageInfo>,
    stride: u64,
    pixel_bytes: u64,
}

impl Default for BmpDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BmpDecoder {
    /// Fresh decoder expecting the `"BM"` signature at stream offset 0.
    pub fn new() -> Self {
        Self {
            limits: ResourceLimits::none(),
            phase: Phase::Signature,
            failure: None,
            cursor: 0,
            file_size: 0,
            data_offset: 0,
            info: None,
            stride: 0,
            pixel_bytes: 0,
        }
    }

    /// Reject streams whose header values exceed `limits`.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits applied to header values.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Bytes per pixel row, once the header is parsed.
    pub fn row_stride(&self) -> Option<u64> {
        self.info.as_ref().map(|_| self.stride)
    }

    fn parse_signature(&mut self, data: &[u8]) -> Result<usize, DecodeError> {
        let probe = &data[..data.len().min(SIGNATURE.len())];
        if probe != &SIGNATURE[..probe.len()] {
            return Err(DecodeError::InvalidFormat("missing BM signature"));
        }
        if data.len() < FILE_HEADER_LEN {
            return Ok(0);
        }

        let file_size = le_u32(data, OFF_FILE_SIZE);
        let data_offset = le_u32(data, OFF_DATA_OFFSET);
        if data_offset < MIN_DATA_OFFSET {
            return Err(DecodeError::InvalidFormat(
                "pixel data offset overlaps the header",
            ));
        }
        self.limits.check_file_size(file_size as u64)?;

        log::debug!("bmp: file size {file_size}, pixel data at {data_offset}");
        self.file_size = file_size;
        self.data_offset = data_offset;
        self.phase = Phase::Header;
        Ok(FILE_HEADER_LEN)
    }

    fn parse_header(
        &mut self,
        data: &[u8],
        target: &mut dyn DecodeTarget,
    ) -> Result<usize, DecodeError> {
        // data_offset >= MIN_DATA_OFFSET, checked in the signature phase.
        let needed = self.header_len();
        if data.len() < needed {
            return Ok(0);
        }
        // `data[0]` is stream byte FILE_HEADER_LEN.
        let field = |at: usize| at - FILE_HEADER_LEN;

        let width = le_u32(data, field(OFF_WIDTH));
        let height = le_u32(data, field(OFF_HEIGHT));
        let bits_per_pixel = le_u16(data, field(OFF_BPP));
        let compression = le_u32(data, field(OFF_COMPRESSION));
        let image_data_size = le_u32(data, field(OFF_IMAGE_SIZE));
        let color_table_entries = le_u32(data, field(OFF_COLORS_USED));

        if bits_per_pixel != 1 {
            return Err(DecodeError::UnsupportedFormat {
                field: "bits per pixel",
                value: bits_per_pixel as u32,
            });
        }
        if compression != 0 {
            return Err(DecodeError::UnsupportedFormat {
                field: "compression",
                value: compression,
            });
        }
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidFormat("zero image dimension"));
        }

        let info = ImageInfo::new(width, height, ImageFormat::Bmp)
            .with_bits_per_pixel(bits_per_pixel)
            .with_compression(compression)
            .with_file_size(self.file_size)
            .with_data_offset(self.data_offset)
            .with_image_data_size(image_data_size)
            .with_color_table_entries(color_table_entries);
        self.limits.check_image_info(&info)?;

        let stride = info.row_stride();
        target.request_canvas(width, height)?;

        log::debug!("bmp: {width}x{height}, stride {stride}, {color_table_entries} colors");
        self.stride = stride;
        self.pixel_bytes = stride * height as u64;
        self.info = Some(info);
        self.phase = Phase::Pixels;
        Ok(needed)
    }

    fn scan_pixels(&mut self, data: &[u8], target: &mut dyn DecodeTarget) -> usize {
        let Some(info) = self.info.as_ref() else {
            return 0;
        };
        let width = info.width as u64;
        let height = info.height as u64;
        let start = self.cursor - self.data_offset as u64;

        let mut taken = 0;
        for &byte in data {
            let p = start + taken as u64;
            if p >= self.pixel_bytes {
                break;
            }
            // p < stride * height, so the row never underflows.
            let y = (height - 1 - p / self.stride) as u32;
            let x0 = ((p % width) * 8) % width;
            for i in 0..8u64 {
                let x = x0 + i;
                if x >= width {
                    break;
                }
                let color = if byte & (0x80 >> i) != 0 {
                    COLOR_ON
                } else {
                    COLOR_OFF
                };
                target.paint_block(x as u32, y, 1, 1, color);
            }
            taken += 1;
        }

        if start + taken as u64 >= self.pixel_bytes {
            log::debug!("bmp: all {} pixel bytes decoded", self.pixel_bytes);
            self.phase = Phase::Done;
        }
        taken
    }

    fn header_len(&self) -> usize {
        usize::try_from(self.data_offset as u64 - FILE_HEADER_LEN as u64).unwrap_or(usize::MAX)
    }
}

impl ImageDecoder for BmpDecoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Bmp
    }

    fn state(&self) -> DecodeState {
        if let Some(err) = &self.failure {
            return DecodeState::Failed(err.clone());
        }
        match self.phase {
            Phase::Signature | Phase::Header => DecodeState::AwaitingHeader,
            Phase::Pixels => DecodeState::AwaitingBody,
            Phase::Done => DecodeState::Complete,
        }
    }

    fn cursor(&self) -> u64 {
        self.cursor
    }

    fn bytes_needed(&self) -> usize {
        match self.phase {
            Phase::Signature => FILE_HEADER_LEN,
            Phase::Header => self.header_len(),
            Phase::Pixels | Phase::Done => 1,
        }
    }

    fn info(&self) -> Option<&ImageInfo> {
        self.info.as_ref()
    }

    fn decode(
        &mut self,
        data: &[u8],
        target: &mut dyn DecodeTarget,
    ) -> Result<usize, DecodeError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut consumed = 0;
        loop {
            let rest = &data[consumed..];
            let step = match self.phase {
                Phase::Signature => self.parse_signature(rest),
                Phase::Header => self.parse_header(rest, target),
                Phase::Pixels => Ok(self.scan_pixels(rest, target)),
                // Trailing bytes after the last row are skipped.
                Phase::Done => Ok(rest.len()),
            };
            match step {
                Ok(0) => break,
                Ok(n) => {
                    consumed += n;
                    self.cursor += n as u64;
                }
                Err(err) => {
                    log::error!("bmp decode failed at byte {}: {err}", self.cursor);
                    self.failure = Some(err.clone());
                    return Err(err);
                }
            }
        }
        Ok(consumed)
    }
}
