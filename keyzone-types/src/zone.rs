//! Zone descriptor: a set of keys that together play a scale, optionally
//! with chord voicing and strumming. Note generation and the key→chord
//! cache are implemented in `keyzone-core::zone`; this is the declarative
//! shape alone.

use serde::{Deserialize, Serialize};

use crate::chord::{ChordType, GuitarPlayerPosition, Instrument, PianoVoicingStyle};
use crate::ids::{AliasHash, KeyCode, LayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutStrategy {
    Linear,
    Grid,
    Piano,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Polyphony {
    Poly,
    Mono,
    Legato {
        glide_time_ms: u32,
        is_adaptive_glide: bool,
        max_glide_time_ms: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrumPattern {
    Down,
    Up,
    AutoAlternating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayMode {
    Direct,
    Strum {
        strum_speed_ms: u32,
        strum_pattern: StrumPattern,
        strum_ghost_notes: bool,
        strum_timing_variation_on: bool,
        strum_timing_variation_ms: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReleaseMode {
    Normal {
        delay_release_on: bool,
        release_duration_ms: u32,
        override_timer: bool,
    },
    Sustain,
}

/// Per-instrument voicing configuration. Piano carries a style + magnet
/// offset; Guitar carries a hand position + fret anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VoicingConfig {
    Piano {
        style: PianoVoicingStyle,
        magnet_semitones: i32,
    },
    Guitar {
        position: GuitarPlayerPosition,
        fret_anchor: i32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    // Identity
    pub name: String,
    pub color: u32,
    pub target_alias_hash: AliasHash,
    pub layer_id: LayerId,

    // Tuning
    pub root_note: u8,
    pub use_global_root: bool,
    pub global_root_octave_offset: i32,
    pub scale_name: String,
    pub use_global_scale: bool,
    pub chromatic_offset: i32,
    pub degree_offset: i32,
    pub ignore_global_transpose: bool,

    // Input
    pub input_key_codes: Vec<KeyCode>,
    pub layout_strategy: LayoutStrategy,
    pub grid_interval: i32,

    // Polyphony
    pub polyphony: Polyphony,

    // Chord
    pub chord_type: ChordType,
    pub instrument: Instrument,
    pub voicing: VoicingConfig,

    // Performance
    pub midi_channel: u8,
    pub base_velocity: u8,
    pub velocity_random: u8,
    pub ghost_velocity_scale: f32,
    pub strict_ghost_harmony: bool,
    pub add_bass_note: bool,
    pub bass_octave_offset: i32,

    // Play mode
    pub play_mode: PlayMode,

    // Release
    pub release_mode: ReleaseMode,
    pub ignore_global_sustain: bool,
}

impl Zone {
    /// A minimal, sane default zone: direct play, poly, root position triad off.
    pub fn new(name: impl Into<String>, layer_id: LayerId) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
            target_alias_hash: AliasHash::ANY,
            layer_id,
            root_note: 60,
            use_global_root: false,
            global_root_octave_offset: 0,
            scale_name: "Major".to_string(),
            use_global_scale: false,
            chromatic_offset: 0,
            degree_offset: 0,
            ignore_global_transpose: false,
            input_key_codes: Vec::new(),
            layout_strategy: LayoutStrategy::Linear,
            grid_interval: 1,
            polyphony: Polyphony::Poly,
            chord_type: ChordType::None,
            instrument: Instrument::Piano,
            voicing: VoicingConfig::Piano {
                style: PianoVoicingStyle::Block,
                magnet_semitones: 0,
            },
            midi_channel: 1,
            base_velocity: 100,
            velocity_random: 0,
            ghost_velocity_scale: 0.6,
            strict_ghost_harmony: true,
            add_bass_note: false,
            bass_octave_offset: -1,
            play_mode: PlayMode::Direct,
            release_mode: ReleaseMode::Normal {
                delay_release_on: false,
                release_duration_ms: 0,
                override_timer: false,
            },
            ignore_global_sustain: false,
        }
    }

    pub fn effective_root(&self, global_root: u8) -> i32 {
        let base = if self.use_global_root {
            global_root as i32
        } else {
            self.root_note as i32
        };
        base + if self.use_global_root {
            12 * self.global_root_octave_offset
        } else {
            0
        }
    }
}
