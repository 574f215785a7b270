//! Fixed-capacity byte FIFO used for the per-channel input and output buffers.
//!
//! [`RingQueue`] is a circular buffer with separate read (`head`) and write
//! (`tail`) positions. `head == tail` always means empty, so the backing
//! storage carries one slot more than the usable [`capacity`](RingQueue::capacity).
//!
//! The buffer is heap-allocated once during construction and never
//! reallocates. Every operation is O(1) and returns immediately.
//!
//! # Example
//!
//! ```rust
//! use sibuf_core::RingQueue;
//!
//! let mut queue = RingQueue::new(4);
//! queue.write(0xD3).unwrap();
//! queue.write(0x0D).unwrap();
//!
//! assert_eq!(queue.peek(), Some(0xD3));
//! assert_eq!(queue.read(), Some(0xD3));
//! assert_eq!(queue.len(), 1);
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;
use alloc::vec;

/// Returned by [`RingQueue::write`] when the queue holds `capacity` bytes.
///
/// Carries the byte that was rejected so the caller can decide what to do
/// with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull(pub u8);

#[cfg(feature = "std")]
impl std::fmt::Display for QueueFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "queue full, byte 0x{:02X} rejected", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QueueFull {}

/// Fixed-capacity circular byte queue.
#[derive(Debug, Clone)]
pub struct RingQueue {
    /// Backing storage, `capacity + 1` slots.
    data: Box<[u8]>,
    /// Next slot to read.
    head: usize,
    /// Next slot to write.
    tail: usize,
}

impl RingQueue {
    /// Creates an empty queue holding at most `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Queue capacity must be > 0");

        Self {
            data: vec![0u8; capacity + 1].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// Maximum number of bytes the queue can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len() - 1
    }

    /// Number of bytes currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        let slots = self.data.len();
        (self.tail + slots - self.head) % slots
    }

    /// Returns true if no bytes are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns true if a further [`write`](Self::write) would fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.advance(self.tail) == self.head
    }

    /// Number of bytes that can still be written.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    #[inline]
    fn advance(&self, pos: usize) -> usize {
        (pos + 1) % self.data.len()
    }

    /// Appends a byte at the tail.
    ///
    /// Fails with [`QueueFull`] when the queue already holds `capacity`
    /// bytes; the queue is left unchanged in that case.
    #[inline]
    pub fn write(&mut self, byte: u8) -> Result<(), QueueFull> {
        let next = self.advance(self.tail);
        if next == self.head {
            return Err(QueueFull(byte));
        }
        self.data[self.tail] = byte;
        self.tail = next;
        Ok(())
    }

    /// Appends a byte, discarding the oldest queued byte if the queue is full.
    ///
    /// Returns the discarded byte, if any.
    pub fn force_write(&mut self, byte: u8) -> Option<u8> {
        let evicted = if self.is_full() { self.read() } else { None };
        // Cannot fail: at least one slot was just freed or was already free.
        let _ = self.write(byte);
        evicted
    }

    /// Removes and returns the byte at the head.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.head];
        self.head = self.advance(self.head);
        Some(byte)
    }

    /// Returns the byte at the head without removing it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.data[self.head])
        }
    }

    /// Discards all queued bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}
