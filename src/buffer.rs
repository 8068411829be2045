//! Bounded transfer buffer for chunked input.
//!
//! [`TransferBuffer`] is a fixed-capacity byte arena that sits between a
//! transport and a decoder. Incoming chunks are appended after the bytes
//! the decoder has not consumed yet; [`consume()`](TransferBuffer::consume)
//! discards the front and compacts the remainder so unread bytes always
//! start at offset 0.
//!
//! ```text
//!  0                 unread_len              capacity
//!  ├──── unread ─────┼──────── free ────────┤
//! ```
//!
//! The buffer never grows on its own. A transport that offers more than
//! [`free()`](TransferBuffer::free) bytes gets
//! [`BufferError::CapacityExceeded`] and must split the chunk, or resize
//! the buffer while it holds nothing the decoder still needs.

use alloc::vec::Vec;
use core::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from transfer buffer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    /// The chunk does not fit in the remaining free space.
    CapacityExceeded {
        /// Bytes the caller tried to append.
        requested: usize,
        /// Free bytes left in the buffer.
        available: usize,
    },
    /// Backing storage could not be allocated.
    OutOfMemory {
        /// Requested capacity in bytes.
        requested: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                available,
            } => write!(
                f,
                "chunk of {requested} bytes exceeds free buffer space of {available} bytes"
            ),
            Self::OutOfMemory { requested } => {
                write!(f, "failed to allocate {requested} byte transfer buffer")
            }
        }
    }
}

impl core::error::Error for BufferError {}

// ---------------------------------------------------------------------------
// TransferBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity byte arena with consume-and-compact semantics.
///
/// Invariant: `unread_len() <= capacity()`, and the unread bytes occupy
/// `storage[..unread_len()]`.
#[derive(Default)]
pub struct TransferBuffer {
    storage: Vec<u8>,
    unread: usize,
}

impl TransferBuffer {
    /// Create an empty buffer with zero capacity.
    ///
    /// Call [`resize()`](Self::resize) before appending.
    pub const fn new() -> Self {
        Self {
            storage: Vec::new(),
            unread: 0,
        }
    }

    /// Create a buffer with `capacity` bytes of storage.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::OutOfMemory`] if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        let mut buf = Self::new();
        if capacity > 0 && buf.resize(capacity) == 0 {
            return Err(BufferError::OutOfMemory {
                requested: capacity,
            });
        }
        Ok(buf)
    }

    /// Allocated size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes appended but not yet consumed.
    #[inline]
    pub fn unread_len(&self) -> usize {
        self.unread
    }

    /// Bytes that can still be appended.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.unread
    }

    /// Whether no unread bytes are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.unread == 0
    }

    /// Whether no more bytes can be appended.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Copy `chunk` in after the unread bytes.
    ///
    /// Nothing is copied if the chunk does not fit.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::CapacityExceeded`] if `chunk.len() > free()`.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), BufferError> {
        let available = self.free();
        if chunk.len() > available {
            return Err(BufferError::CapacityExceeded {
                requested: chunk.len(),
                available,
            });
        }
        let end = self.unread + chunk.len();
        self.storage[self.unread..end].copy_from_slice(chunk);
        self.unread = end;
        Ok(())
    }

    /// Read-only view of the unread bytes starting at `offset`.
    ///
    /// An `offset` past the unread region is a caller bug: it is logged and
    /// the view from the buffer start is returned instead.
    pub fn read(&self, offset: usize) -> &[u8] {
        if offset > self.unread {
            log::error!(
                "transfer buffer read at offset {offset} beyond {} unread bytes",
                self.unread
            );
            return &self.storage[..self.unread];
        }
        &self.storage[offset..self.unread]
    }

    /// All unread bytes.
    #[inline]
    pub fn unread(&self) -> &[u8] {
        &self.storage[..self.unread]
    }

    /// Discard the first `n` unread bytes, shifting the rest to offset 0.
    ///
    /// Returns the number of unread bytes left.
    pub fn consume(&mut self, n: usize) -> usize {
        if n >= self.unread {
            self.unread = 0;
            return 0;
        }
        self.storage.copy_within(n..self.unread, 0);
        self.unread -= n;
        self.unread
    }

    /// Drop all unread bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.unread = 0;
    }

    /// Reallocate storage to exactly `size` bytes and reset to empty.
    ///
    /// Destroys any unread content. Returns `size` on success and `0` if the
    /// allocation failed, in which case the buffer is left with no storage.
    /// Resizing to the current capacity is a no-op that keeps the content.
    pub fn resize(&mut self, size: usize) -> usize {
        if self.storage.len() == size {
            return size;
        }
        self.storage = Vec::new();
        self.unread = 0;
        let mut storage = Vec::new();
        if storage.try_reserve_exact(size).is_err() {
            log::error!("failed to allocate {size} byte transfer buffer");
            return 0;
        }
        storage.resize(size, 0u8);
        self.storage = storage;
        size
    }
}

impl fmt::Debug for TransferBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("capacity", &self.capacity())
            .field("unread", &self.unread)
            .finish()
    }
}
