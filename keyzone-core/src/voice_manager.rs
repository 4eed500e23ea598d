//! Voice manager: owns the list of sounding voices and the sustain/latch
//! coordinator state that governs what happens to a voice on release. Kept
//! as plain fields on this struct rather than process-wide globals.

use keyzone_types::ids::InputId;
use keyzone_types::runtime::{Voice, VoiceState};

use crate::midi::MidiOutputPort;

struct PendingRelease {
    source: InputId,
    expires_at_ms: u64,
}

pub struct VoiceManager {
    voices: Vec<Voice>,
    pending_releases: Vec<PendingRelease>,
    sustain_on: bool,
    latch_on: bool,
}

impl VoiceManager {
    pub fn new() -> Self {
        Self {
            voices: Vec::new(),
            pending_releases: Vec::new(),
            sustain_on: false,
            latch_on: false,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn sustain_on(&self) -> bool {
        self.sustain_on
    }

    pub fn latch_on(&self) -> bool {
        self.latch_on
    }

    fn coalesced_note_off(port: &mut dyn MidiOutputPort, voices: &[Voice]) {
        let mut sent: Vec<(u8, i32)> = Vec::new();
        for v in voices {
            let key = (v.channel, v.pitch);
            if !sent.contains(&key) {
                port.send_note_off(v.channel, v.pitch.clamp(0, 127) as u8);
                sent.push(key);
            }
        }
    }

    /// Register a voice already sounded (e.g. by the strum scheduler's
    /// tick) so key-up/sustain/latch logic can find it later.
    pub fn register_voice(&mut self, source: InputId, channel: u8, pitch: i32, is_ghost: bool, allow_sustain: bool) {
        let mut voice = Voice::new(source, channel, pitch, allow_sustain);
        voice.is_ghost = is_ghost;
        self.voices.push(voice);
    }

    /// `note_on`. Latched re-press of the same source acts as
    /// "release the latch" rather than retriggering.
    pub fn note_on(
        &mut self,
        port: &mut dyn MidiOutputPort,
        source: InputId,
        channel: u8,
        pitch: i32,
        velocity_0_1: f32,
        allow_sustain: bool,
    ) {
        if self.latch_on {
            let matching: Vec<Voice> = self
                .voices
                .iter()
                .filter(|v| v.source == source && matches!(v.state, VoiceState::Playing | VoiceState::Latched))
                .copied()
                .collect();
            if !matching.is_empty() {
                Self::coalesced_note_off(port, &matching);
                self.voices.retain(|v| v.source != source);
                return;
            }
        }
        port.send_note_on(channel, pitch.clamp(0, 127) as u8, velocity_0_1);
        self.register_voice(source, channel, pitch, false, allow_sustain);
    }

    /// Immediate-fire chord path (`strum_speed_ms == 0`). The strummed path
    /// is the scheduler's job; its tick calls back into
    /// [`VoiceManager::register_voice`] as each note comes due.
    pub fn note_on_chord(
        &mut self,
        port: &mut dyn MidiOutputPort,
        source: InputId,
        notes: &[(i32, u8, bool)],
        channel: u8,
        allow_sustain: bool,
    ) {
        for &(pitch, velocity, is_ghost) in notes {
            port.send_note_on(channel, pitch.clamp(0, 127) as u8, velocity as f32 / 127.0);
            self.register_voice(source, channel, pitch, is_ghost, allow_sustain);
        }
    }

    fn apply_release_now(&mut self, port: &mut dyn MidiOutputPort, source: InputId) {
        let mut to_release = Vec::new();
        let latch_on = self.latch_on;
        let sustain_on = self.sustain_on;
        self.voices.retain_mut(|v| {
            if v.source != source {
                return true;
            }
            if latch_on {
                v.state = VoiceState::Latched;
                true
            } else if sustain_on && v.allow_sustain {
                v.state = VoiceState::Sustained;
                true
            } else {
                to_release.push(*v);
                false
            }
        });
        Self::coalesced_note_off(port, &to_release);
    }

    /// `ReleaseBehavior::SustainUntilRetrigger`: hold `source`'s voices as
    /// `Sustained` regardless of whether the global pedal is down. They
    /// release on the pedal's next falling edge, or on panic.
    pub fn force_sustain(&mut self, source: InputId) {
        for v in self.voices.iter_mut().filter(|v| v.source == source) {
            v.state = VoiceState::Sustained;
        }
    }

    /// `ReleaseBehavior::AlwaysLatch`: hold `source`'s voices as `Latched`
    /// regardless of the global latch toggle. They release on the latch's
    /// next falling edge (if released-on-toggle-off), a retrigger, or panic.
    pub fn force_latch(&mut self, source: InputId) {
        for v in self.voices.iter_mut().filter(|v| v.source == source) {
            v.state = VoiceState::Latched;
        }
    }

    /// `handle_key_up`. `sustain_through` only matters to the strum
    /// scheduler's own queue (see `StrumScheduler::mark_source_released`);
    /// here it's accepted for signature parity but doesn't change the
    /// release rule applied to already-sounding voices.
    pub fn handle_key_up(
        &mut self,
        port: &mut dyn MidiOutputPort,
        now_ms: u64,
        source: InputId,
        release_duration_ms: u32,
        _sustain_through: bool,
    ) {
        if release_duration_ms > 0 {
            self.pending_releases.push(PendingRelease {
                source,
                expires_at_ms: now_ms + release_duration_ms as u64,
            });
        } else {
            self.apply_release_now(port, source);
        }
    }

    /// Drain any pending releases whose delay has expired. Call once per
    /// dispatcher tick, driven by the same release-expiry timer as the
    /// other millisecond-resolution engines.
    pub fn tick_pending_releases(&mut self, port: &mut dyn MidiOutputPort, now_ms: u64) {
        let due: Vec<InputId> = {
            let (due, remaining): (Vec<_>, Vec<_>) = self
                .pending_releases
                .drain(..)
                .partition(|p| p.expires_at_ms <= now_ms);
            self.pending_releases = remaining;
            due.into_iter().map(|p| p.source).collect()
        };
        for source in due {
            self.apply_release_now(port, source);
        }
    }

    /// `set_sustain`. Falling edge releases every `Sustained` voice.
    pub fn set_sustain(&mut self, port: &mut dyn MidiOutputPort, active: bool) {
        let falling_edge = self.sustain_on && !active;
        self.sustain_on = active;
        if falling_edge {
            let released: Vec<Voice> = self
                .voices
                .iter()
                .filter(|v| v.state == VoiceState::Sustained)
                .copied()
                .collect();
            self.voices.retain(|v| v.state != VoiceState::Sustained);
            Self::coalesced_note_off(port, &released);
        }
    }

    /// `set_latch`. `release_on_toggle_off` mirrors the LatchToggle
    /// command's "release latched on off" option.
    pub fn set_latch(&mut self, port: &mut dyn MidiOutputPort, active: bool, release_on_toggle_off: bool) {
        let falling_edge = self.latch_on && !active;
        self.latch_on = active;
        if falling_edge && release_on_toggle_off {
            let released: Vec<Voice> = self
                .voices
                .iter()
                .filter(|v| v.state == VoiceState::Latched)
                .copied()
                .collect();
            self.voices.retain(|v| v.state != VoiceState::Latched);
            Self::coalesced_note_off(port, &released);
        }
    }

    /// `panic`: clear all voices, all-notes-off. Clearing the strum
    /// queue is the caller's job (it owns the `StrumScheduler` instance).
    pub fn panic(&mut self, port: &mut dyn MidiOutputPort) {
        self.voices.clear();
        self.pending_releases.clear();
        port.all_notes_off();
    }

    /// `panic_latch`: NoteOff + drop only `Latched` voices.
    pub fn panic_latch(&mut self, port: &mut dyn MidiOutputPort) {
        let released: Vec<Voice> = self
            .voices
            .iter()
            .filter(|v| v.state == VoiceState::Latched)
            .copied()
            .collect();
        self.voices.retain(|v| v.state != VoiceState::Latched);
        Self::coalesced_note_off(port, &released);
    }
}

impl Default for VoiceManager {
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
    fn note_on_then_key_up_sends_note_off() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.handle_key_up(&mut port, 0, input(1), 0, false);
        assert_eq!(
            port.sent,
            vec![Recorded::NoteOn(1, 60, 127), Recorded::NoteOff(1, 60)]
        );
    }

    #[test]
    fn sustain_holds_notes_until_falling_edge() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.set_sustain(&mut port, true);
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.handle_key_up(&mut port, 0, input(1), 0, false);
        assert!(!port.sent.iter().any(|r| matches!(r, Recorded::NoteOff(..))));

        vm.set_sustain(&mut port, false);
        assert_eq!(port.sent.last(), Some(&Recorded::NoteOff(1, 60)));
    }

    #[test]
    fn note_off_coalesces_shared_pitch_across_sources() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.set_latch(&mut port, true, false);
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.note_on(&mut port, input(2), 1, 60, 1.0, true);
        vm.handle_key_up(&mut port, 0, input(1), 0, false);
        vm.handle_key_up(&mut port, 0, input(2), 0, false);

        vm.set_latch(&mut port, false, true);
        let note_offs = port.sent.iter().filter(|r| matches!(r, Recorded::NoteOff(..))).count();
        assert_eq!(note_offs, 1);
    }

    #[test]
    fn latched_repress_releases_instead_of_retriggering() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.set_latch(&mut port, true, false);
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.handle_key_up(&mut port, 0, input(1), 0, false);
        assert!(vm.voices().iter().any(|v| v.state == VoiceState::Latched));

        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        assert!(!vm.voices().iter().any(|v| v.source == input(1)));
        assert_eq!(port.sent.last(), Some(&Recorded::NoteOff(1, 60)));
    }

    #[test]
    fn panic_clears_voices_and_sends_all_notes_off() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.panic(&mut port);
        assert!(vm.voices().is_empty());
        assert_eq!(
            port.sent.iter().filter(|r| matches!(r, Recorded::Cc(_, 123, 0))).count(),
            16
        );
    }

    #[test]
    fn ignore_global_sustain_voice_releases_immediately_under_pedal() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.set_sustain(&mut port, true);
        vm.note_on(&mut port, input(1), 1, 60, 1.0, false);
        vm.handle_key_up(&mut port, 0, input(1), 0, false);
        assert_eq!(port.sent.last(), Some(&Recorded::NoteOff(1, 60)));
    }

    #[test]
    fn delayed_release_applies_only_after_expiry() {
        let mut vm = VoiceManager::new();
        let mut port = RecordingPort::default();
        vm.note_on(&mut port, input(1), 1, 60, 1.0, true);
        vm.handle_key_up(&mut port, 0, input(1), 200, false);
        vm.tick_pending_releases(&mut port, 100);
        assert!(!port.sent.iter().any(|r| matches!(r, Recorded::NoteOff(..))));
        vm.tick_pending_releases(&mut port, 200);
        assert!(port.sent.iter().any(|r| matches!(r, Recorded::NoteOff(..))));
    }
}
