//! Fixed-capacity circular buffer shared between a cpal callback and the
//! pipeline thread.
//!
//! When the buffer is full, new samples **overwrite** the oldest data. For a
//! live microphone that is the right trade: late audio is worth less than
//! current audio.
//!
//! # Example
//!
//! ```rust
//! use vocal_tune::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1i16, 2, 3, 4, 5]); // capacity 4 → oldest dropped
//! let mut out = [0i16; 2];
//! assert_eq!(buf.pop_into(&mut out), 2);
//! assert_eq!(out, [2, 3]);
//! assert_eq!(buf.drain(), vec![4, 5]);
//! ```

/// A fixed-capacity FIFO that overwrites its oldest items on overflow.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid items currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, returning how many stored items were overwritten.
    pub fn push_slice(&mut self, data: &[T]) -> usize {
        let mut overwritten = 0;
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            } else {
                overwritten += 1;
            }
        }
        overwritten
    }

    /// Move up to `out.len()` of the oldest items into `out`, returning the
    /// number moved.
    pub fn pop_into(&mut self, out: &mut [T]) -> usize {
        let n = out.len().min(self.len);
        let read_pos = self.read_pos();
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.buf[(read_pos + i) % self.capacity];
        }
        self.len -= n;
        n
    }

    /// Drain all stored items in chronological order and reset the buffer.
    pub fn drain(&mut self) -> Vec<T> {
        let mut result = vec![T::default(); self.len];
        self.pop_into(&mut result);
        self.clear();
        result
    }

    /// Discard all items.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    // Oldest valid item sits `len` slots behind the write head.
    fn read_pos(&self) -> usize {
        (self.write_pos + self.capacity - self.len) % self.capacity
    }
}
