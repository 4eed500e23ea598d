//! Strum scheduler: a single time-ordered queue of pending note-ons,
//! drained by a ~1 kHz timer in the owning engine thread. Keeps its own
//! alternating-direction toggle so repeated AutoAlternating strums flip
//! stroke direction call over call.

use keyzone_types::ids::InputId;
use keyzone_types::runtime::PendingStrumNote;
use keyzone_types::zone::StrumPattern;

use crate::midi::MidiOutputPort;
use crate::voice_manager::VoiceManager;

struct ReleaseMark {
    released_at_ms: u64,
    duration_ms: u32,
    sustain_through: bool,
}

pub struct StrumScheduler {
    queue: Vec<PendingStrumNote>,
    alternate_toggle: bool,
    release_marks: std::collections::HashMap<InputId, ReleaseMark>,
}

fn uniform_jitter(humanize_ms: u32) -> i64 {
    if humanize_ms == 0 {
        return 0;
    }
    let span = humanize_ms as i64;
    rand::random::<i64>().rem_euclid(2 * span + 1) - span
}

impl StrumScheduler {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            alternate_toggle: false,
            release_marks: std::collections::HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// `trigger_strum`. `notes`/`velocities` must be parallel slices in
    /// root-to-top order; direction and alternation are applied here.
    #[allow(clippy::too_many_arguments)]
    pub fn trigger_strum(
        &mut self,
        notes: &[i32],
        velocities: &[u8],
        channel: u8,
        source: InputId,
        speed_ms: u32,
        allow_sustain: bool,
        pattern: StrumPattern,
        humanize_ms: u32,
        now_ms: u64,
    ) {
        let down = match pattern {
            StrumPattern::Down => true,
            StrumPattern::Up => false,
            StrumPattern::AutoAlternating => {
                let this_down = !self.alternate_toggle;
                self.alternate_toggle = !self.alternate_toggle;
                this_down
            }
        };

        let mut order: Vec<usize> = (0..notes.len()).collect();
        if !down {
            order.reverse();
        }

        for (i, &idx) in order.iter().enumerate() {
            let jitter = uniform_jitter(humanize_ms);
            let target_time_ms = (now_ms as i64 + i as i64 * speed_ms as i64 + jitter).max(0) as u64;
            self.queue.push(PendingStrumNote {
                note: notes[idx],
                velocity: velocities[idx],
                channel,
                target_time_ms,
                source,
                allow_sustain,
            });
        }
    }

    /// `mark_source_released`. Any queued note for `source` whose
    /// target time lands after `released_at_ms + duration_ms` is dropped on
    /// the next tick, unless `sustain_through`.
    pub fn mark_source_released(&mut self, source: InputId, now_ms: u64, duration_ms: u32, sustain_through: bool) {
        self.release_marks.insert(
            source,
            ReleaseMark {
                released_at_ms: now_ms,
                duration_ms,
                sustain_through,
            },
        );
    }

    pub fn cancel_pending(&mut self, source: InputId) {
        self.queue.retain(|n| n.source != source);
        self.release_marks.remove(&source);
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.release_marks.clear();
    }

    /// Tick, called at high resolution (~1 kHz). Due notes are either
    /// dropped (released, past the release window, not sustain-through) or
    /// sounded and registered with the voice manager.
    pub fn tick(&mut self, now_ms: u64, port: &mut dyn MidiOutputPort, voice_manager: &mut VoiceManager) {
        let release_marks = &self.release_marks;
        let (due, remaining): (Vec<_>, Vec<_>) = self.queue.drain(..).partition(|n| n.target_time_ms <= now_ms);
        self.queue = remaining;

        for note in due {
            if let Some(mark) = release_marks.get(&note.source) {
                let cutoff = mark.released_at_ms + mark.duration_ms as u64;
                if note.target_time_ms > cutoff && !mark.sustain_through {
                    continue;
                }
            }
            port.send_note_on(note.channel, note.note.clamp(0, 127) as u8, note.velocity as f32 / 127.0);
            voice_manager.register_voice(note.source, note.channel, note.note, false, note.allow_sustain);
        }

        self.release_marks
            .retain(|source, _| self.queue.iter().any(|n| &n.source == source));
    }
}

impl Default for StrumScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::test_support::{Recorded, RecordingPort};

    fn input(key: i32) -> InputId {
        InputId::new(1, key)
    }

    #[test]
    fn down_stroke_orders_notes_root_to_top_by_speed() {
        let mut sched = StrumScheduler::new();
        sched.trigger_strum(&[60, 64, 67], &[100, 100, 100], 1, input(1), 50, true, StrumPattern::Down, 0, 0);
        assert_eq!(sched.queue[0].note, 60);
        assert_eq!(sched.queue[0].target_time_ms, 0);
        assert_eq!(sched.queue[1].target_time_ms, 50);
        assert_eq!(sched.queue[2].target_time_ms, 100);
    }

    #[test]
    fn up_stroke_reverses_note_order() {
        let mut sched = StrumScheduler::new();
        sched.trigger_strum(&[60, 64, 67], &[100, 100, 100], 1, input(1), 50, true, StrumPattern::Up, 0, 0);
        assert_eq!(sched.queue[0].note, 67);
        assert_eq!(sched.queue[2].note, 60);
    }

    #[test]
    fn auto_alternating_flips_direction_each_call() {
        let mut sched = StrumScheduler::new();
        sched.trigger_strum(&[60, 64], &[100, 100], 1, input(1), 50, true, StrumPattern::AutoAlternating, 0, 0);
        let first_note = sched.queue[0].note;
        sched.queue.clear();
        sched.trigger_strum(&[60, 64], &[100, 100], 1, input(2), 50, true, StrumPattern::AutoAlternating, 0, 0);
        let second_note = sched.queue[0].note;
        assert_ne!(first_note, second_note);
    }

    #[test]
    fn tick_fires_due_notes_and_registers_voices() {
        let mut sched = StrumScheduler::new();
        let mut port = RecordingPort::default();
        let mut vm = VoiceManager::new();
        sched.trigger_strum(&[60, 64], &[100, 100], 1, input(1), 50, true, StrumPattern::Down, 0, 0);

        sched.tick(0, &mut port, &mut vm);
        assert_eq!(port.sent, vec![Recorded::NoteOn(1, 60, 100)]);
        assert_eq!(vm.voices().len(), 1);

        sched.tick(50, &mut port, &mut vm);
        assert_eq!(port.sent.len(), 2);
        assert_eq!(vm.voices().len(), 2);
        assert!(sched.is_empty());
    }

    #[test]
    fn release_drops_late_notes_unless_sustain_through() {
        let mut sched = StrumScheduler::new();
        let mut port = RecordingPort::default();
        let mut vm = VoiceManager::new();
        sched.trigger_strum(&[60, 64, 67], &[100, 100, 100], 1, input(1), 50, true, StrumPattern::Down, 0, 0);

        sched.mark_source_released(input(1), 10, 5, false);
        sched.tick(0, &mut port, &mut vm);
        assert_eq!(port.sent.len(), 1);

        sched.tick(100, &mut port, &mut vm);
        assert_eq!(port.sent.len(), 1);
        assert!(sched.is_empty());
    }

    #[test]
    fn cancel_pending_drops_only_that_source() {
        let mut sched = StrumScheduler::new();
        sched.trigger_strum(&[60], &[100], 1, input(1), 50, true, StrumPattern::Down, 0, 0);
        sched.trigger_strum(&[62], &[100], 1, input(2), 50, true, StrumPattern::Down, 0, 0);
        sched.cancel_pending(input(1));
        assert_eq!(sched.queue.len(), 1);
        assert_eq!(sched.queue[0].source, input(2));
    }
}
