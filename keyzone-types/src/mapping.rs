//! Manual (non-zone) key mappings: a single key producing a Note,
//! Expression, or Command action.

use serde::{Deserialize, Serialize};

use crate::ids::{KeyCode, LayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseBehavior {
    SendNoteOff,
    SustainUntilRetrigger,
    AlwaysLatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAction {
    pub channel: u8,
    pub midi_note: u8,
    pub velocity: u8,
    pub velocity_random: u8,
    pub release_behavior: ReleaseBehavior,
    pub follow_transpose: bool,
    /// Whether the global sustain pedal may hold this note past key-up.
    /// A zone with `ignore_global_sustain` set bakes `false` here; a plain
    /// manual mapping (no zone behind it) always allows sustain.
    pub allow_sustain: bool,
}

impl Default for NoteAction {
    fn default() -> Self {
        Self {
            channel: 1,
            midi_note: 60,
            velocity: 100,
            velocity_random: 0,
            release_behavior: ReleaseBehavior::SendNoteOff,
            follow_transpose: true,
            allow_sustain: true,
        }
    }
}

/// ADSR target domain. The integer discriminants match the legacy encoding:
/// 1=CC, 2=PitchBend, 3=SmartScaleBend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdsrTarget {
    Cc,
    PitchBend,
    SmartScaleBend,
}

impl AdsrTarget {
    /// Migrate a legacy integer encoding to the string-form target.
    /// An out-of-range value falls back to `None` rather than guessing.
    pub fn from_legacy(value: i32) -> Option<AdsrTarget> {
        match value {
            1 => Some(AdsrTarget::Cc),
            2 => Some(AdsrTarget::PitchBend),
            3 => Some(AdsrTarget::SmartScaleBend),
            _ => None,
        }
    }

    pub fn is_pitch_bend(self) -> bool {
        matches!(self, AdsrTarget::PitchBend | AdsrTarget::SmartScaleBend)
    }
}

/// How the physical input continuously drives an expression mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressionInputMode {
    /// A momentary key: on press, ramp to peak; on release, ramp to off.
    KeyPress,
    /// Absolute position (e.g. touchpad axis): value tracks position directly.
    Position,
    /// Relative slide (e.g. touch drag delta).
    Slide,
    /// Incremental encoder (e.g. scroll wheel ticks).
    Encoder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnvelopeSettings {
    pub use_custom_envelope: bool,
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub sustain_0_1: f32,
    pub release_ms: u32,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            use_custom_envelope: false,
            attack_ms: 10,
            decay_ms: 10,
            sustain_0_1: 0.7,
            release_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpressionAction {
    pub adsr_target: AdsrTarget,
    pub channel: u8,
    /// CC number, meaningful only when `adsr_target == Cc`.
    pub data1: u8,
    /// Peak value: 0..127 domain for CC, 0..16383 domain for PitchBend/SmartScaleBend.
    pub data2: i32,
    pub envelope: EnvelopeSettings,
    pub value_when_on: i32,
    pub value_when_off: i32,
    pub input_mode: ExpressionInputMode,
}

impl Default for ExpressionAction {
    fn default() -> Self {
        Self {
            adsr_target: AdsrTarget::Cc,
            channel: 1,
            data1: 1,
            data2: 127,
            envelope: EnvelopeSettings::default(),
            value_when_on: 127,
            value_when_off: 0,
            input_mode: ExpressionInputMode::KeyPress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanicMode {
    All,
    LatchedOnly,
    ChordsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransposeOp {
    PlusOne,
    MinusOne,
    PlusOctave,
    MinusOctave,
    Set(i32),
}

/// The enumerated command set. `LayerSolo` treats its target as clear-all,
/// then activate; the global root/scale variants cover the five operations
/// a preset's global tuning panel needs: direct root set, scale switch,
/// toggling whether a zone follows the global root/scale, and nudging the
/// global root by an octave.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Command {
    SustainMomentary,
    SustainToggle,
    SustainInverse,
    LatchToggle,
    Panic(PanicMode),
    PanicLatch,
    Transpose(TransposeOp),
    /// Legacy alias for `Transpose(MinusOne)`, kept as its own id for old presets.
    GlobalPitchDownLegacy,
    GlobalModeUp,
    GlobalModeDown,
    LayerMomentary(LayerId),
    LayerToggle(LayerId),
    LayerSolo(LayerId),
    SetGlobalRoot(u8),
    SetGlobalScale(u32),
    ToggleUseGlobalRoot,
    ToggleUseGlobalScale,
    NudgeGlobalRootOctave(i32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Action {
    Note(NoteAction),
    Expression(ExpressionAction),
    Command(Command),
}

/// A single-key manual mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    pub input_key: KeyCode,
    /// Empty string means "any device".
    pub input_alias: String,
    pub layer_id: LayerId,
    pub action: Action,
    pub enabled: bool,
}

impl Mapping {
    pub fn new(input_key: KeyCode, layer_id: LayerId, action: Action) -> Self {
        Self {
            input_key,
            input_alias: String::new(),
            layer_id,
            action,
            enabled: true,
        }
    }

    pub fn targets_any_device(&self) -> bool {
        self.input_alias.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_adsr_target_migration() {
        assert_eq!(AdsrTarget::from_legacy(1), Some(AdsrTarget::Cc));
        assert_eq!(AdsrTarget::from_legacy(2), Some(AdsrTarget::PitchBend));
        assert_eq!(AdsrTarget::from_legacy(3), Some(AdsrTarget::SmartScaleBend));
        assert_eq!(AdsrTarget::from_legacy(99), None);
    }

    #[test]
    fn pitch_bend_targets_flagged() {
        assert!(AdsrTarget::PitchBend.is_pitch_bend());
        assert!(AdsrTarget::SmartScaleBend.is_pitch_bend());
        assert!(!AdsrTarget::Cc.is_pitch_bend());
    }

    #[test]
    fn mapping_any_device_by_default() {
        let m = Mapping::new(0x51, 0, Action::Note(NoteAction::default()));
        assert!(m.targets_any_device());
    }
}
