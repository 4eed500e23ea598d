//! MIDI output port contract plus a `midir`-backed implementation.
//! Everything upstream of this module (voice manager, envelope engine,
//! strum scheduler) talks to the `MidiOutputPort` trait, never to `midir`
//! directly, so tests can swap in a recording fake.

mod delay;

pub use delay::DelayBuffer;

/// The output-port contract every real-time engine sends through.
/// Channels are 1..16 at this boundary; implementations translate to the
/// wire's 0..15 internally.
pub trait MidiOutputPort: Send {
    fn send_note_on(&mut self, channel: u8, note: u8, velocity_0_1: f32);
    fn send_note_off(&mut self, channel: u8, note: u8);
    fn send_cc(&mut self, channel: u8, cc: u8, value: u8);
    fn send_pitch_bend(&mut self, channel: u8, value_0_16383: u16);
    fn send_program_change(&mut self, channel: u8, program: u8);

    /// CC 123 (all notes off) on every channel.
    fn all_notes_off(&mut self) {
        for channel in 1..=16 {
            self.send_cc(channel, 123, 0);
        }
    }

    /// Pitch-Bend-Range RPN: CC101=0, CC100=0, CC6=range_semitones, CC38=0.
    fn send_pitch_bend_range(&mut self, channel: u8, range_semitones: u8) {
        self.send_cc(channel, 101, 0);
        self.send_cc(channel, 100, 0);
        self.send_cc(channel, 6, range_semitones);
        self.send_cc(channel, 38, 0);
    }
}

fn wire_channel(channel: u8) -> u8 {
    channel.saturating_sub(1).min(15)
}

/// Live port backed by a `midir` output connection.
pub struct MidirOutputPort {
    connection: midir::MidiOutputConnection,
}

impl MidirOutputPort {
    pub fn open(port_name_hint: &str) -> crate::error::Result<Self> {
        let midi_out = midir::MidiOutput::new("keyzone")
            .map_err(|e| crate::error::KeyzoneError::MidiPort(e.to_string()))?;
        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .map(|n| n.contains(port_name_hint))
                    .unwrap_or(false)
            })
            .or_else(|| ports.first())
            .ok_or_else(|| crate::error::KeyzoneError::MidiPort("no MIDI output ports available".to_string()))?;

        let connection = midi_out
            .connect(port, "keyzone-out")
            .map_err(|e| crate::error::KeyzoneError::MidiPort(e.to_string()))?;

        Ok(Self { connection })
    }

    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.connection.send(bytes) {
            log::warn!(target: "midi", "failed to send MIDI message: {e}");
        }
    }
}

impl MidiOutputPort for MidirOutputPort {
    fn send_note_on(&mut self, channel: u8, note: u8, velocity_0_1: f32) {
        let velocity = (velocity_0_1.clamp(0.0, 1.0) * 127.0).round() as u8;
        self.send(&[0x90 | wire_channel(channel), note, velocity]);
    }

    fn send_note_off(&mut self, channel: u8, note: u8) {
        self.send(&[0x80 | wire_channel(channel), note, 0]);
    }

    fn send_cc(&mut self, channel: u8, cc: u8, value: u8) {
        self.send(&[0xB0 | wire_channel(channel), cc, value]);
    }

    fn send_pitch_bend(&mut self, channel: u8, value_0_16383: u16) {
        let value = value_0_16383.min(16383);
        let lsb = (value & 0x7F) as u8;
        let msb = ((value >> 7) & 0x7F) as u8;
        self.send(&[0xE0 | wire_channel(channel), lsb, msb]);
    }

    fn send_program_change(&mut self, channel: u8, program: u8) {
        self.send(&[0xC0 | wire_channel(channel), program]);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::MidiOutputPort;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Recorded {
        NoteOn(u8, u8, u8),
        NoteOff(u8, u8),
        Cc(u8, u8, u8),
        PitchBend(u8, u16),
        ProgramChange(u8, u8),
    }

    #[derive(Default)]
    pub struct RecordingPort {
        pub sent: Vec<Recorded>,
    }

    impl MidiOutputPort for RecordingPort {
        fn send_note_on(&mut self, channel: u8, note: u8, velocity_0_1: f32) {
            let vel = (velocity_0_1.clamp(0.0, 1.0) * 127.0).round() as u8;
            self.sent.push(Recorded::NoteOn(channel, note, vel));
        }

        fn send_note_off(&mut self, channel: u8, note: u8) {
            self.sent.push(Recorded::NoteOff(channel, note));
        }

        fn send_cc(&mut self, channel: u8, cc: u8, value: u8) {
            self.sent.push(Recorded::Cc(channel, cc, value));
        }

        fn send_pitch_bend(&mut self, channel: u8, value_0_16383: u16) {
            self.sent.push(Recorded::PitchBend(channel, value_0_16383));
        }

        fn send_program_change(&mut self, channel: u8, program: u8) {
            self.sent.push(Recorded::ProgramChange(channel, program));
        }
    }
}
