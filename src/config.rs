//! Session configuration.

use core::fmt;

use crate::{ImageFormat, ResourceLimits};

/// Transfer buffer size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;
/// Smallest accepted transfer buffer size.
pub const MIN_BUFFER_SIZE: usize = 256;
/// Largest accepted transfer buffer size.
pub const MAX_BUFFER_SIZE: usize = 65536;

/// Settings for one [`DecodeSession`](crate::DecodeSession).
///
/// # Example
///
/// ```
/// use zenstream::{ImageFormat, ResourceLimits, SessionConfig};
///
/// let config = SessionConfig::new(ImageFormat::Bmp)
///     .with_buffer_size(4096)
///     .with_limits(ResourceLimits::none().with_max_pixels(800 * 480));
/// assert!(config.validate().is_ok());
/// assert!(SessionConfig::new(ImageFormat::Bmp).with_buffer_size(64).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct SessionConfig {
    /// Transfer buffer capacity in bytes.
    pub buffer_size: usize,
    /// Format of the incoming stream.
    pub format: ImageFormat,
    /// Limits applied to header values.
    pub limits: ResourceLimits,
}

impl SessionConfig {
    /// Defaults for `format`: 2048-byte buffer, no limits.
    pub fn new(format: ImageFormat) -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            format,
            limits: ResourceLimits::none(),
        }
    }

    /// Set the transfer buffer capacity.
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Set the stream format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Check that every setting is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::BufferSize {
                actual: self.buffer_size,
                min: MIN_BUFFER_SIZE,
                max: MAX_BUFFER_SIZE,
            });
        }
        Ok(())
    }
}

/// A [`SessionConfig`] value is out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Buffer size outside `[min, max]`.
    BufferSize {
        /// Configured size.
        actual: usize,
        /// Smallest accepted size.
        min: usize,
        /// Largest accepted size.
        max: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferSize { actual, min, max } => {
                write!(f, "buffer size {actual} outside {min}..={max}")
            }
        }
    }
}

impl core::error::Error for ConfigError {}
