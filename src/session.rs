//! Chunk-fed decode session.
//!
//! [`DecodeSession`] bundles the three per-image resources (transfer
//! buffer, format decoder, rasterizer over the caller's canvas) and runs
//! the driver loop for each chunk the transport delivers:
//!
//! 1. append as much of the chunk as fits into the transfer buffer,
//! 2. hand the unread bytes to the decoder,
//! 3. consume what the decoder reports, then repeat until the chunk is
//!    exhausted.
//!
//! A decoder that makes no progress on a full buffer needs more bytes than
//! the buffer can ever hold; the session fails with
//! [`BufferError::CapacityExceeded`] instead of spinning.
//!
//! ```
//! use zenstream::{DecodeSession, ImageFormat, PixelCanvas, SessionConfig, StreamStatus, Unstoppable};
//!
//! let config = SessionConfig::new(ImageFormat::Bmp);
//! let mut session = DecodeSession::new(&config, PixelCanvas::auto()).unwrap();
//! assert_eq!(session.feed(b"BM", &Unstoppable).unwrap(), StreamStatus::NeedMoreData);
//! assert!(session.finish().is_err()); // truncated
//! ```

use alloc::boxed::Box;

use enough::Stop;

use crate::{
    BufferError, Canvas, DecodeError, DecodeState, ImageDecoder, ImageInfo, Rasterizer, Scale,
    SessionConfig, TransferBuffer,
};

/// Progress reported after each [`feed()`](DecodeSession::feed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamStatus {
    /// The header is not complete yet.
    NeedMoreData,
    /// The header is parsed and the canvas sized; pixels are arriving.
    HeaderReady,
    /// The image is fully decoded. Further input is ignored.
    Complete,
}

/// One image download: buffer, decoder and canvas.
pub struct DecodeSession<C> {
    buffer: TransferBuffer,
    decoder: Box<dyn ImageDecoder>,
    raster: Rasterizer<C>,
    received: u64,
    failure: Option<DecodeError>,
}

impl<C: Canvas> DecodeSession<C> {
    /// Start a session decoding `config.format` into `canvas`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Config`] for an out-of-range configuration,
    /// [`DecodeError::Buffer`] if the transfer buffer cannot be allocated.
    pub fn new(config: &SessionConfig, canvas: C) -> Result<Self, DecodeError> {
        let decoder = config.format.decoder(config.limits);
        Self::with_decoder(config, decoder, canvas)
    }

    /// Start a session with a caller-supplied decoder.
    ///
    /// `config.format` is ignored; the buffer size is still validated.
    pub fn with_decoder(
        config: &SessionConfig,
        decoder: Box<dyn ImageDecoder>,
        canvas: C,
    ) -> Result<Self, DecodeError> {
        config.validate()?;
        let mut buffer = TransferBuffer::new();
        if buffer.resize(config.buffer_size) == 0 {
            return Err(BufferError::OutOfMemory {
                requested: config.buffer_size,
            }
            .into());
        }
        log::debug!(
            "{} session, {} byte transfer buffer",
            decoder.format(),
            buffer.capacity()
        );
        Ok(Self {
            buffer,
            decoder,
            raster: Rasterizer::new(canvas),
            received: 0,
            failure: None,
        })
    }

    /// Push the next transport chunk through the decoder.
    ///
    /// `stop` is checked before every decode step.
    ///
    /// # Errors
    ///
    /// Any decoder error, [`DecodeError::Stopped`] when `stop` fires, or
    /// [`BufferError::CapacityExceeded`] when the decoder needs more bytes
    /// than the buffer holds. Errors are terminal; later calls return the
    /// same error.
    pub fn feed(&mut self, chunk: &[u8], stop: &dyn Stop) -> Result<StreamStatus, DecodeError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        match self.pump(chunk, stop) {
            Ok(()) => Ok(self.status()),
            Err(err) => {
                log::error!("decode failed after {} bytes: {err}", self.received);
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    fn pump(&mut self, mut chunk: &[u8], stop: &dyn Stop) -> Result<(), DecodeError> {
        self.received += chunk.len() as u64;
        loop {
            stop.check()?;

            let (head, tail) = chunk.split_at(chunk.len().min(self.buffer.free()));
            self.buffer.append(head)?;
            chunk = tail;

            let consumed = self
                .decoder
                .decode(self.buffer.unread(), &mut self.raster)?;
            self.buffer.consume(consumed);

            if chunk.is_empty() {
                return Ok(());
            }
            if consumed == 0 && self.buffer.is_full() {
                return Err(BufferError::CapacityExceeded {
                    requested: self.decoder.bytes_needed(),
                    available: self.buffer.capacity(),
                }
                .into());
            }
        }
    }

    /// Progress so far. A failed session reports the phase it failed in.
    pub fn status(&self) -> StreamStatus {
        match self.decoder.state() {
            DecodeState::Complete => StreamStatus::Complete,
            DecodeState::AwaitingBody => StreamStatus::HeaderReady,
            DecodeState::AwaitingHeader | DecodeState::Failed(_) => {
                if self.decoder.info().is_some() {
                    StreamStatus::HeaderReady
                } else {
                    StreamStatus::NeedMoreData
                }
            }
        }
    }

    /// Decoder state, including a stored failure.
    pub fn state(&self) -> DecodeState {
        match &self.failure {
            Some(err) => DecodeState::Failed(err.clone()),
            None => self.decoder.state(),
        }
    }

    /// Header metadata, once parsed.
    pub fn info(&self) -> Option<&ImageInfo> {
        self.decoder.info()
    }

    /// Scale factors, once the canvas is sized.
    pub fn scale(&self) -> Option<Scale> {
        self.raster.scale()
    }

    /// Total bytes passed to [`feed()`](Self::feed).
    pub fn received_bytes(&self) -> u64 {
        self.received
    }

    /// Stream bytes the decoder has consumed.
    pub fn decoded_bytes(&self) -> u64 {
        self.decoder.cursor()
    }

    /// Bytes sitting in the transfer buffer.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.unread_len()
    }

    /// Borrow the canvas (possibly partially painted).
    pub fn canvas(&self) -> &C {
        self.raster.canvas()
    }

    /// End of stream: return the finished canvas.
    ///
    /// # Errors
    ///
    /// The stored failure, or [`DecodeError::Truncated`] if the image is
    /// incomplete.
    pub fn finish(self) -> Result<C, DecodeError> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        if !self.decoder.is_finished() {
            let cursor = self.decoder.cursor();
            log::warn!("stream ended at byte {cursor} before the image was complete");
            return Err(DecodeError::Truncated { cursor });
        }
        Ok(self.raster.into_canvas())
    }

    /// Abandon the session. Already painted pixels stay on the canvas.
    pub fn cancel(self) -> C {
        log::debug!("session cancelled after {} bytes", self.received);
        self.raster.into_canvas()
    }
}

impl<C> core::fmt::Debug for DecodeSession<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("buffer", &self.buffer)
            .field("format", &self.decoder.format())
            .field("cursor", &self.decoder.cursor())
            .field("received", &self.received)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        COLOR_OFF, COLOR_ON, Color, DecodeTarget, ImageFormat, PixelCanvas, ResourceLimits,
        StopReason, Unstoppable,
    };
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicU32, Ordering};

    /// 1-bit BMP with a 62-byte header (`pad` extra bytes before pixels).
    fn bmp(width: u32, height: u32, pixels: &[u8], pad: usize) -> Vec<u8> {
        let offset = 62 + pad as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&(offset + pixels.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&[1, 0, 1, 0]); // planes, bpp
        out.extend_from_slice(&[0; 4]); // compression
        out.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&[0, 0, 0, 0, 255, 255, 255, 0]);
        out.resize(offset as usize, 0);
        out.extend_from_slice(pixels);
        out
    }

    fn session(buffer_size: usize) -> DecodeSession<PixelCanvas> {
        let config = SessionConfig::new(ImageFormat::Bmp).with_buffer_size(buffer_size);
        DecodeSession::new(&config, PixelCanvas::auto()).unwrap()
    }

    /// Fires after `n` checks.
    struct StopAfter {
        remaining: AtomicU32,
    }

    impl Stop for StopAfter {
        fn check(&self) -> Result<(), StopReason> {
            let left = self.remaining.load(Ordering::Relaxed);
            if left == 0 {
                return Err(StopReason::Cancelled);
            }
            self.remaining.store(left - 1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error)]
    enum FetchError {
        #[error("http status {0}")]
        Status(u16),
        #[error(transparent)]
        Decode(#[from] DecodeError),
    }

    fn download(chunks: &[&[u8]]) -> Result<PixelCanvas, FetchError> {
        let mut session = session(256);
        for chunk in chunks {
            if chunk.is_empty() {
                return Err(FetchError::Status(500));
            }
            session.feed(chunk, &Unstoppable)?;
        }
        Ok(session.finish()?)
    }

    #[test]
    fn decodes_canonical_image() {
        let file = bmp(2, 2, &[0b1000_0000, 0b0100_0000], 0);
        let mut session = session(256);
        assert_eq!(session.feed(&file, &Unstoppable).unwrap(), StreamStatus::Complete);
        assert_eq!(session.decoded_bytes(), file.len() as u64);
        assert_eq!(session.received_bytes(), file.len() as u64);
        assert_eq!(session.buffered_bytes(), 0);
        assert_eq!(session.scale(), Some(Scale::ONE));
        let canvas = session.finish().unwrap();
        assert_eq!(canvas.pixel(0, 1), Some(COLOR_ON));
        assert_eq!(canvas.pixel(1, 1), Some(COLOR_OFF));
        assert_eq!(canvas.pixel(0, 0), Some(COLOR_OFF));
        assert_eq!(canvas.pixel(1, 0), Some(COLOR_ON));
    }

    #[test]
    fn reports_progress_per_phase() {
        let file = bmp(8, 2, &[0xFF, 0x00], 0);
        let mut session = session(256);
        assert_eq!(session.feed(&file[..30], &Unstoppable).unwrap(), StreamStatus::NeedMoreData);
        assert!(session.info().is_none());
        assert_eq!(session.feed(&file[30..63], &Unstoppable).unwrap(), StreamStatus::HeaderReady);
        assert_eq!(session.info().map(|i| (i.width, i.height)), Some((8, 2)));
        assert_eq!(session.state(), DecodeState::AwaitingBody);
        assert_eq!(session.feed(&file[63..], &Unstoppable).unwrap(), StreamStatus::Complete);
        // Extra bytes after completion are swallowed.
        assert_eq!(session.feed(&[1, 2, 3], &Unstoppable).unwrap(), StreamStatus::Complete);
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        // 20x9, stride 3; offset padding pushes the header past one buffer.
        let pixels: Vec<u8> = (0..27u8).map(|i| i.wrapping_mul(37) ^ 0x5A).collect();
        let file = bmp(20, 9, &pixels, 300);

        let mut whole = session(512);
        whole.feed(&file, &Unstoppable).unwrap();
        let expected = whole.finish().unwrap();

        for chunk in [1, 3, 64, 255, 256, 257, 1000] {
            let mut s = session(512);
            for piece in file.chunks(chunk) {
                s.feed(piece, &Unstoppable).unwrap();
            }
            let canvas = s.finish().unwrap();
            assert_eq!(
                canvas.as_img().unwrap().buf(),
                expected.as_img().unwrap().buf(),
                "chunk size {chunk}"
            );
        }
    }

    #[test]
    fn small_buffer_streams_large_chunks() {
        // 100x40, stride 13
        let pixels = vec![0xAA; 13 * 40];
        let file = bmp(100, 40, &pixels, 0);
        let mut s = session(256);
        assert_eq!(s.feed(&file, &Unstoppable).unwrap(), StreamStatus::Complete);
        let canvas = s.finish().unwrap();
        assert_eq!(canvas.pixel(0, 39), Some(COLOR_ON));
        assert_eq!(canvas.pixel(1, 39), Some(COLOR_OFF));
        assert_eq!(canvas.pixel(98, 39), Some(COLOR_ON));
    }

    #[test]
    fn header_larger_than_buffer_fails() {
        let file = bmp(2, 2, &[0, 0], 400);
        let mut s = session(256);
        let err = s.feed(&file, &Unstoppable).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Buffer(BufferError::CapacityExceeded {
                requested: 448,
                available: 256
            })
        );
        assert!(matches!(s.state(), DecodeState::Failed(_)));
        assert_eq!(s.feed(&[0], &Unstoppable).unwrap_err(), err);
    }

    #[test]
    fn stop_token_cancels_between_steps() {
        let file = bmp(2, 2, &[0xFF, 0xFF], 0);
        let mut s = session(256);
        let stop = StopAfter {
            remaining: AtomicU32::new(0),
        };
        let err = s.feed(&file, &stop).unwrap_err();
        assert_eq!(err, DecodeError::Stopped(StopReason::Cancelled));
        assert_eq!(s.decoded_bytes(), 0);
        assert!(s.finish().is_err());

        // Fires on the second step: the first 256 bytes are decoded.
        let file = bmp(100, 40, &vec![0; 13 * 40], 0);
        let mut s = session(256);
        let stop = StopAfter {
            remaining: AtomicU32::new(1),
        };
        assert!(s.feed(&file, &stop).is_err());
        assert_eq!(s.decoded_bytes(), 256);
    }

    #[test]
    fn cancel_keeps_partial_pixels() {
        let file = bmp(8, 2, &[0xFF, 0xFF], 0);
        let mut s = session(256);
        // Header plus the bottom row only.
        s.feed(&file[..63], &Unstoppable).unwrap();
        let canvas = s.cancel();
        assert_eq!(canvas.pixel(0, 1), Some(COLOR_ON));
        assert_eq!(canvas.pixel(0, 0), Some(COLOR_OFF));
    }

    #[test]
    fn truncated_stream() {
        let file = bmp(8, 2, &[0xFF, 0xFF], 0);
        let mut s = session(256);
        s.feed(&file[..63], &Unstoppable).unwrap();
        assert_eq!(s.finish().unwrap_err(), DecodeError::Truncated { cursor: 63 });
    }

    #[test]
    fn bad_input_is_terminal() {
        let mut s = session(256);
        let err = s.feed(b"GIF89a", &Unstoppable).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
        assert_eq!(s.status(), StreamStatus::NeedMoreData);
        assert_eq!(s.feed(b"BM", &Unstoppable).unwrap_err(), err);
    }

    #[test]
    fn rejects_bad_config() {
        let config = SessionConfig::new(ImageFormat::Bmp).with_buffer_size(16);
        let err = DecodeSession::new(&config, PixelCanvas::auto()).unwrap_err();
        assert!(matches!(err, DecodeError::Config(_)));
    }

    #[test]
    fn limits_flow_to_decoder() {
        let config = SessionConfig::new(ImageFormat::Bmp)
            .with_limits(ResourceLimits::none().with_max_pixels(3));
        let mut s = DecodeSession::new(&config, PixelCanvas::auto()).unwrap();
        let err = s.feed(&bmp(2, 2, &[0, 0], 0), &Unstoppable).unwrap_err();
        assert!(matches!(err, DecodeError::LimitExceeded(_)));
        assert!(!s.canvas().is_allocated());
    }

    #[test]
    fn scales_into_fixed_canvas() {
        let config = SessionConfig::new(ImageFormat::Bmp);
        let mut s = DecodeSession::new(&config, PixelCanvas::fixed(4, 4)).unwrap();
        s.feed(&bmp(2, 2, &[0b1000_0000, 0b0100_0000], 0), &Unstoppable)
            .unwrap();
        assert_eq!(s.scale(), Some(Scale { x: 2.0, y: 2.0 }));
        let canvas = s.finish().unwrap();
        // Source (0,1) ON -> canvas [0,2) x [2,4)
        assert_eq!(canvas.pixel(0, 2), Some(COLOR_ON));
        assert_eq!(canvas.pixel(1, 3), Some(COLOR_ON));
        assert_eq!(canvas.pixel(2, 2), Some(COLOR_OFF));
        assert_eq!(canvas.pixel(3, 0), Some(COLOR_ON));
        assert_eq!(canvas.pixel(0, 0), Some(COLOR_OFF));
    }

    #[test]
    fn custom_decoder() {
        // One-byte header giving a square size, then one byte per pixel.
        struct Squares {
            side: Option<u32>,
            cursor: u64,
        }

        impl ImageDecoder for Squares {
            fn format(&self) -> ImageFormat {
                ImageFormat::Bmp
            }
            fn state(&self) -> DecodeState {
                match self.side {
                    None => DecodeState::AwaitingHeader,
                    Some(s) if self.cursor > (s * s) as u64 => DecodeState::Complete,
                    Some(_) => DecodeState::AwaitingBody,
                }
            }
            fn cursor(&self) -> u64 {
                self.cursor
            }
            fn bytes_needed(&self) -> usize {
                1
            }
            fn info(&self) -> Option<&ImageInfo> {
                None
            }
            fn decode(
                &mut self,
                data: &[u8],
                target: &mut dyn DecodeTarget,
            ) -> Result<usize, DecodeError> {
                let mut used = 0;
                for &b in data {
                    match self.side {
                        None => {
                            target.request_canvas(b as u32, b as u32)?;
                            self.side = Some(b as u32);
                        }
                        Some(s) => {
                            let p = (self.cursor - 1) as u32;
                            if p >= s * s {
                                break;
                            }
                            let color: Color = if b != 0 { COLOR_ON } else { COLOR_OFF };
                            target.paint_block(p % s, p / s, 1, 1, color);
                        }
                    }
                    self.cursor += 1;
                    used += 1;
                }
                Ok(used)
            }
        }

        let config = SessionConfig::new(ImageFormat::Bmp);
        let decoder = Box::new(Squares {
            side: None,
            cursor: 0,
        });
        let mut s = DecodeSession::with_decoder(&config, decoder, PixelCanvas::auto()).unwrap();
        assert_eq!(s.feed(&[2, 0, 1, 1, 0], &Unstoppable).unwrap(), StreamStatus::Complete);
        let canvas = s.finish().unwrap();
        assert_eq!(canvas.pixel(1, 0), Some(COLOR_ON));
        assert_eq!(canvas.pixel(1, 1), Some(COLOR_OFF));
    }

    #[test]
    fn host_error_wraps_decode_error() {
        let file = bmp(2, 2, &[0, 0], 0);
        assert!(download(&[&file[..10], &file[10..]]).is_ok());

        let err = download(&[&file[..10], &[]]).unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));

        let err = download(&[&file[..10]]).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Decode(DecodeError::Truncated { cursor: 0 })
        ));
        assert_eq!(
            alloc::format!("{err}"),
            "stream ended after 0 bytes, image incomplete"
        );
    }

    #[test]
    fn debug_output_names_format() {
        let s = session(256);
        let text = alloc::format!("{s:?}");
        assert!(text.contains("Bmp"));
    }
}
