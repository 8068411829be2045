//! Decode error taxonomy.

use core::fmt;

use enough::StopReason;

use crate::buffer::BufferError;
use crate::config::ConfigError;
use crate::limits::LimitExceeded;

/// Errors produced while decoding a stream.
///
/// Every variant is terminal for the session that produced it: retrying
/// the same bytes cannot succeed. Retry policy (re-fetching the image)
/// belongs to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The stream is not in the expected format (bad magic, impossible
    /// header layout).
    InvalidFormat(&'static str),
    /// The format is recognized but uses a feature this decoder does not
    /// implement (bit depth, compression method).
    UnsupportedFormat {
        /// Which header field was rejected.
        field: &'static str,
        /// The value found in the stream.
        value: u32,
    },
    /// The destination canvas could not be allocated.
    OutOfMemory {
        /// Requested canvas width.
        width: u32,
        /// Requested canvas height.
        height: u32,
    },
    /// The transfer buffer could not accept or hold the input.
    Buffer(BufferError),
    /// A header value exceeded a configured resource limit.
    LimitExceeded(LimitExceeded),
    /// The caller cancelled the session.
    Stopped(StopReason),
    /// The session configuration was rejected.
    Config(ConfigError),
    /// The stream ended before the image was complete.
    Truncated {
        /// Bytes of the stream the decoder had processed.
        cursor: u64,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(reason) => write!(f, "invalid image data: {reason}"),
            Self::UnsupportedFormat { field, value } => {
                write!(f, "unsupported {field}: {value}")
            }
            Self::OutOfMemory { width, height } => {
                write!(f, "out of memory allocating {width}x{height} canvas")
            }
            Self::Buffer(err) => write!(f, "transfer buffer: {err}"),
            Self::LimitExceeded(err) => write!(f, "limit exceeded: {err}"),
            Self::Stopped(reason) => write!(f, "decode stopped: {reason:?}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Truncated { cursor } => {
                write!(f, "stream ended after {cursor} bytes, image incomplete")
            }
        }
    }
}

impl core::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Buffer(err) => Some(err),
            Self::LimitExceeded(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BufferError> for DecodeError {
    fn from(err: BufferError) -> Self {
        Self::Buffer(err)
    }
}

impl From<LimitExceeded> for DecodeError {
    fn from(err: LimitExceeded) -> Self {
        Self::LimitExceeded(err)
    }
}

impl From<ConfigError> for DecodeError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<StopReason> for DecodeError {
    fn from(reason: StopReason) -> Self {
        Self::Stopped(reason)
    }
}
