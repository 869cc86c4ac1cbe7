//! In-memory transport and clock for tests.

use std::{
    cell::Cell,
    collections::VecDeque,
    io,
    time::{Duration, Instant},
};

use crate::{Clock, Transport};

/// Loopback-style transport.
///
/// Bytes pushed with [`push_incoming`](Self::push_incoming) are readable
/// immediately. Replies queued with [`queue_reply`](Self::queue_reply) become
/// readable after the next write, the way a controller answers a request.
#[derive(Debug, Default)]
pub struct MockTransport {
    incoming: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    pub fn queue_reply(&mut self, bytes: Vec<u8>) {
        self.replies.push_back(bytes);
    }

    pub fn pending(&self) -> usize {
        self.incoming.len()
    }

    /// Every buffer passed to `write`, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.written.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.incoming.extend(reply);
        }
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.incoming.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.incoming
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no data buffered"))
    }
}

/// Clock that moves forward by a fixed step every time it is read.
#[derive(Debug)]
pub struct MockClock {
    now: Cell<Instant>,
    step: Duration,
}

impl MockClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Instant::now()),
            step,
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
