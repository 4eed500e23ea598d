//! Chord generation inputs/outputs: types, not algorithms (the algorithms
//! live in `keyzone-core::chord`).

use serde::{Deserialize, Serialize};

/// A single note produced by chord generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordNote {
    /// MIDI pitch, always clamped to 0..127.
    pub pitch: i32,
    /// Ghost notes fill harmonic/spatial gaps and are played quieter.
    pub is_ghost: bool,
}

impl ChordNote {
    pub fn new(pitch: i32) -> Self {
        Self {
            pitch: pitch.clamp(0, 127),
            is_ghost: false,
        }
    }

    pub fn ghost(pitch: i32) -> Self {
        Self {
            pitch: pitch.clamp(0, 127),
            is_ghost: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordType {
    None,
    Triad,
    Seventh,
    Ninth,
    Power5,
}

/// Piano voicing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PianoVoicingStyle {
    Block,
    Close,
    Open,
}

/// Guitar fretboard hand positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuitarPlayerPosition {
    Campfire,
    Rhythm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instrument {
    Piano,
    Guitar,
}

/// The resolved voicing instructions for a zone, combining instrument +
/// style/position into the single enum the generator switches on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Voicing {
    RootPosition,
    Smooth { magnet_semitones: i32 },
    GuitarSpread,
    PianoBlock,
    PianoClose { magnet_semitones: i32 },
    PianoOpen { magnet_semitones: i32 },
    GuitarCampfire,
    GuitarRhythm { fret_anchor: i32 },
}
