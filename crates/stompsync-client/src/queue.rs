use std::collections::VecDeque;

use bytes::Bytes;

/// An encoded message waiting to be written, possibly partially sent.
#[derive(Debug)]
struct OutgoingMessage {
    bytes: Bytes,
    written: usize,
}

impl OutgoingMessage {
    fn remaining(&self) -> &[u8] {
        &self.bytes[self.written..]
    }
}

/// FIFO of encoded messages awaiting transport writability.
///
/// Messages leave the queue only once every byte has been written, so a short
/// write never reorders or interleaves them.
#[derive(Debug, Default)]
pub struct OutgoingQueue {
    messages: VecDeque<OutgoingMessage>,
}

impl OutgoingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Empty messages are dropped.
    pub fn push(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.messages.push_back(OutgoingMessage { bytes, written: 0 });
    }

    /// Unwritten bytes of the oldest message.
    pub fn front(&self) -> Option<&[u8]> {
        self.messages.front().map(OutgoingMessage::remaining)
    }

    /// Record that `n` bytes of the oldest message were written, dropping it
    /// once complete.
    pub fn consume(&mut self, n: usize) {
        let Some(front) = self.messages.front_mut() else {
            return;
        };
        front.written = (front.written + n).min(front.bytes.len());
        if front.written == front.bytes.len() {
            self.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Unwritten bytes across all messages.
    pub fn pending_bytes(&self) -> usize {
        self.messages.iter().map(|m| m.remaining().len()).sum()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_writes_keep_order() {
        let mut queue = OutgoingQueue::new();
        queue.push(Bytes::from_static(b"abc"));
        queue.push(Bytes::from_static(b"de"));

        queue.consume(2);
        assert_eq!(queue.front(), Some(&b"c"[..]));
        assert_eq!(queue.pending_bytes(), 3);

        queue.consume(1);
        assert_eq!(queue.front(), Some(&b"de"[..]));
        assert_eq!(queue.len(), 1);

        queue.consume(2);
        assert!(queue.is_empty());
        assert_eq!(queue.front(), None);
    }

    #[test]
    fn empty_messages_are_not_queued() {
        let mut queue = OutgoingQueue::new();
        queue.push(Bytes::new());
        assert!(queue.is_empty());
    }

    #[test]
    fn consume_on_empty_queue_is_harmless() {
        let mut queue = OutgoingQueue::new();
        queue.consume(10);
        assert!(queue.is_empty());
    }
}
