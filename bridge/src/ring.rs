//! Fixed-capacity byte ring shared by the dispatcher and the serial pump.
//!
//! One slot is always left empty so that `head == tail` means empty and
//! `tail + 1 == head` means full. Usable capacity is therefore `N - 1`.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueError {
    /// No free slot; the byte was not stored.
    Full,
    /// The ring has not been bound by [`RingBuffer::init`] yet.
    Uninitialized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DequeueError {
    Empty,
    Uninitialized,
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full => write!(f, "ring full"),
            EnqueueError::Uninitialized => write!(f, "ring not initialized"),
        }
    }
}

impl fmt::Display for DequeueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DequeueError::Empty => write!(f, "ring empty"),
            DequeueError::Uninitialized => write!(f, "ring not initialized"),
        }
    }
}

/// Circular byte queue with `N` slots.
///
/// N must be a power of 2 so indices wrap with a mask.
pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    head: usize,
    tail: usize,
    bound: bool,
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = N - 1;

    /// Create an unbound ring. Every operation reports `Uninitialized`
    /// until [`init`](Self::init) is called.
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two() && N >= 2, "Ring size must be a power of 2") };

        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            bound: false,
        }
    }

    /// Bind the storage and discard anything queued.
    pub fn init(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.bound = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.bound
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.tail + 1) & Self::MASK == self.head
    }

    /// Number of bytes waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head) & Self::MASK
    }

    #[inline]
    pub fn enqueue(&mut self, byte: u8) -> Result<(), EnqueueError> {
        if !self.bound {
            return Err(EnqueueError::Uninitialized);
        }
        if self.is_full() {
            return Err(EnqueueError::Full);
        }
        self.data[self.tail] = byte;
        self.tail = (self.tail + 1) & Self::MASK;
        Ok(())
    }

    #[inline]
    pub fn dequeue(&mut self) -> Result<u8, DequeueError> {
        if !self.bound {
            return Err(DequeueError::Uninitialized);
        }
        if self.is_empty() {
            return Err(DequeueError::Empty);
        }
        let byte = self.data[self.head];
        self.head = (self.head + 1) & Self::MASK;
        Ok(byte)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
