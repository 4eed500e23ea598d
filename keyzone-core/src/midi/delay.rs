//! Optional delay-for-recording buffer: every outbound message can
//! be held and released `delay_seconds` later in FIFO order, to give a
//! user time to arm a recorder after triggering a mapping. A 20 Hz
//! draining timer services the buffer in the owning engine's tick loop.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayedMessage {
    NoteOn(u8, u8, f32),
    NoteOff(u8, u8),
    Cc(u8, u8, u8),
    PitchBend(u8, u16),
    ProgramChange(u8, u8),
}

struct Entry {
    release_at_ms: u64,
    message: DelayedMessage,
}

/// FIFO delay line. `now_ms` is supplied by the caller's clock rather than
/// read internally, keeping this deterministic for tests.
pub struct DelayBuffer {
    delay_ms: u64,
    queue: VecDeque<Entry>,
}

impl DelayBuffer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, now_ms: u64, message: DelayedMessage) {
        self.queue.push_back(Entry {
            release_at_ms: now_ms + self.delay_ms,
            message,
        });
    }

    /// Drain every message whose release time has passed, in FIFO order.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<DelayedMessage> {
        let mut due = Vec::new();
        while let Some(front) = self.queue.front() {
            if front.release_at_ms > now_ms {
                break;
            }
            due.push(self.queue.pop_front().unwrap().message);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_release_in_fifo_order_after_delay() {
        let mut buf = DelayBuffer::new(1000);
        buf.push(0, DelayedMessage::NoteOn(1, 60, 1.0));
        buf.push(10, DelayedMessage::NoteOn(1, 64, 1.0));

        assert!(buf.drain_due(500).is_empty());
        let due = buf.drain_due(1000);
        assert_eq!(due, vec![DelayedMessage::NoteOn(1, 60, 1.0)]);
        let due = buf.drain_due(1010);
        assert_eq!(due, vec![DelayedMessage::NoteOn(1, 64, 1.0)]);
    }
}
