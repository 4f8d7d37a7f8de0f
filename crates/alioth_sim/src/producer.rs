//! Background reader feeding the byte queue.

use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::queue::ByteQueue;

/// Name of the input thread.
pub const PRODUCER_THREAD_NAME: &str = "uart-rx-input";

/// Handle to the thread that copies an input stream into a [`ByteQueue`].
///
/// The thread reads one byte at a time and may block on the source
/// indefinitely. End of stream and read errors both end it quietly and
/// close the queue; bytes already queued are left in place.
#[derive(Debug)]
pub struct StdinProducer {
    handle: JoinHandle<u64>,
}

impl StdinProducer {
    /// Starts the input thread.
    pub fn spawn<R>(source: R, queue: Arc<ByteQueue>) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.to_string())
            .spawn(move || pump(source, &queue))?;
        Ok(Self { handle })
    }

    /// Returns `true` once the thread has stopped reading.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread and returns how many bytes it queued.
    ///
    /// Only useful for finite sources; a console source never ends.
    pub fn join(self) -> thread::Result<u64> {
        self.handle.join()
    }

    /// Abandons the thread.
    ///
    /// It stays blocked on its source until the process exits; the queue it
    /// holds is kept alive by its own reference.
    pub fn detach(self) {
        if !self.handle.is_finished() {
            log::debug!("leaving {PRODUCER_THREAD_NAME} thread blocked on input");
        }
    }
}

fn pump<R: Read>(source: R, queue: &ByteQueue) -> u64 {
    let mut pushed = 0u64;
    for byte in source.bytes() {
        let byte = match byte {
            Ok(b) => b,
            Err(e) => {
                log::debug!("input read failed, treating as end of stream: {e}");
                break;
            }
        };
        if !queue.push(byte) {
            break;
        }
        pushed += 1;
    }
    log::debug!("input stream ended after {pushed} bytes");
    queue.close();
    pushed
}
