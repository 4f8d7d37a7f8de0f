//! Byte FIFO shared between the input thread and the simulation loop.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct State {
    bytes: VecDeque<u8>,
    closed: bool,
}

/// Thread-safe FIFO of bytes awaiting injection onto the RX pin.
///
/// Bytes leave in the order they were pushed and are never dropped once
/// accepted. The queue is unbounded unless built with
/// [`ByteQueue::bounded`], in which case [`push`](ByteQueue::push) blocks the
/// producer until the consumer makes room.
#[derive(Debug)]
pub struct ByteQueue {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl Default for ByteQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ByteQueue {
    /// Creates a queue with no depth limit.
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(State::default()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    /// Creates a queue holding at most `depth` bytes (at least one).
    pub fn bounded(depth: usize) -> Self {
        Self {
            capacity: Some(depth.max(1)),
            ..Self::unbounded()
        }
    }

    /// `0` selects an unbounded queue, anything else a bounded one.
    pub fn with_depth(depth: usize) -> Self {
        if depth == 0 {
            Self::unbounded()
        } else {
            Self::bounded(depth)
        }
    }

    // The queue holds plain bytes, so a panic elsewhere cannot leave it
    // half-updated.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum depth, or `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends a byte and wakes a waiting consumer.
    ///
    /// Blocks while a bounded queue is full. Returns `false` without queuing
    /// if the queue has been closed.
    pub fn push(&self, byte: u8) -> bool {
        let mut state = self.lock();
        if let Some(cap) = self.capacity {
            while state.bytes.len() >= cap && !state.closed {
                state = self
                    .not_full
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        if state.closed {
            return false;
        }
        state.bytes.push_back(byte);
        drop(state);
        self.not_empty.notify_one();
        true
    }

    /// Removes the head byte without blocking.
    pub fn try_pop(&self) -> Option<u8> {
        let byte = self.lock().bytes.pop_front();
        if byte.is_some() {
            self.not_full.notify_one();
        }
        byte
    }

    /// Removes the head byte, waiting up to `timeout` for one to arrive.
    ///
    /// Returns early with `None` once the queue is closed and empty.
    pub fn wait_pop(&self, timeout: Duration) -> Option<u8> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(byte) = state.bytes.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(byte);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Returns `true` if at least one byte is waiting.
    pub fn has_pending(&self) -> bool {
        !self.lock().bytes.is_empty()
    }

    /// Number of bytes waiting.
    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    /// Returns `true` if no byte is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().bytes.is_empty()
    }

    /// Marks the end of input and wakes every blocked caller.
    ///
    /// Bytes already queued stay poppable.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Returns `true` once [`close`](ByteQueue::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
