//! Live performance state: sounding voices, pending strums, running
//! envelopes, and layer/sustain/latch/transpose state. Owned and mutated
//! by the real-time engines in `keyzone-core`; this module only defines
//! the shapes they pass around.

use serde::{Deserialize, Serialize};

use crate::ids::{AliasHash, InputId, LayerId};
use crate::mapping::AdsrTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceState {
    Playing,
    Sustained,
    Latched,
}

/// One sounding MIDI note, tracked so a key-up (or sustain/latch release)
/// can find and stop it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Voice {
    pub source: InputId,
    pub channel: u8,
    pub pitch: i32,
    pub state: VoiceState,
    pub is_ghost: bool,
    /// Whether the global sustain pedal may hold this voice past key-up
    /// (a zone with `ignore_global_sustain` set plumbs `false` here).
    pub allow_sustain: bool,
}

impl Voice {
    pub fn new(source: InputId, channel: u8, pitch: i32, allow_sustain: bool) -> Self {
        Self {
            source,
            channel,
            pitch,
            state: VoiceState::Playing,
            is_ghost: false,
            allow_sustain,
        }
    }
}

/// A note queued by the strum scheduler, due at `target_time_ms` on the
/// engine's monotonic clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PendingStrumNote {
    pub note: i32,
    pub velocity: u8,
    pub channel: u8,
    pub target_time_ms: u64,
    pub source: InputId,
    /// If false, this note is dropped rather than sounded once its source
    /// key has been released and the release window has expired.
    pub allow_sustain: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// One running ADSR envelope, ticked by the envelope engine at its fixed
/// rate. `current_level` is in the 0.0..=1.0 domain; the engine maps
/// it to the target's wire range (CC 0..127 or pitch-bend 0..16383) when
/// it sends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActiveEnvelope {
    pub source: InputId,
    pub channel: u8,
    pub target: AdsrTarget,
    pub data1: u8,
    pub peak_value: i32,
    /// Value the target falls back to at rest (0 for CC, 8192 center for bend).
    pub value_when_off: i32,
    pub stage: EnvelopeStage,
    pub current_level: f32,
    pub stage_progress_ms: u32,
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub sustain_0_1: f32,
    pub release_ms: u32,
    pub last_sent_value: i32,
    /// A pitch-bend envelope pushed off the top of its channel's priority
    /// stack ticks but doesn't send, waiting to be woken on release.
    pub is_dormant: bool,
}

impl ActiveEnvelope {
    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::Finished
    }
}

/// How many keys are currently holding a layer active (for momentary
/// layers) vs. whether a toggle has latched it on, per layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerActivationState {
    pub hold_refcount: [u32; crate::ids::LAYER_COUNT],
    pub toggled_on: [bool; crate::ids::LAYER_COUNT],
}

impl LayerActivationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, layer: LayerId) -> bool {
        let i = layer as usize;
        self.hold_refcount[i] > 0 || self.toggled_on[i]
    }

    /// The highest-numbered active layer wins when a device's input is
    /// resolved against the stacked layers: later layers shadow earlier
    /// ones in the per-device stack.
    pub fn highest_active(&self) -> LayerId {
        for layer in (0..crate::ids::LAYER_COUNT as LayerId).rev() {
            if self.is_active(layer) {
                return layer;
            }
        }
        0
    }
}

/// Global performance modifiers that apply across all zones and mappings
/// unless a zone opts out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalPerformanceState {
    pub sustain_on: bool,
    pub latch_on: bool,
    pub transpose_semitones: i32,
    /// Degree (scale-step) transpose driven by GlobalModeUp/Down, separate
    /// from the chromatic `transpose_semitones` nudge.
    pub degree_transpose: i32,
    pub global_root: u8,
    pub global_scale_index: u32,
    pub use_global_root: bool,
    pub use_global_scale: bool,
}

impl Default for GlobalPerformanceState {
    fn default() -> Self {
        Self {
            sustain_on: false,
            latch_on: false,
            transpose_semitones: 0,
            degree_transpose: 0,
            global_root: 60,
            global_scale_index: 0,
            use_global_root: true,
            use_global_scale: true,
        }
    }
}

/// One entry in a channel's pitch-bend priority stack: only the
/// top-of-stack envelope may drive pitch bend on a channel at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PitchBendStackEntry {
    pub source: InputId,
    pub channel: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PitchBendPriorityStacks {
    pub stacks: std::collections::HashMap<u8, Vec<PitchBendStackEntry>>,
}

impl PitchBendPriorityStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, channel: u8, source: InputId) {
        self.stacks
            .entry(channel)
            .or_default()
            .push(PitchBendStackEntry { source, channel });
    }

    /// Remove `source` from its channel's stack; returns the new top entry,
    /// if any, so the caller can hand pitch-bend ownership to it.
    pub fn remove(&mut self, channel: u8, source: InputId) -> Option<PitchBendStackEntry> {
        if let Some(stack) = self.stacks.get_mut(&channel) {
            stack.retain(|e| e.source != source);
            return stack.last().copied();
        }
        None
    }

    pub fn top(&self, channel: u8) -> Option<PitchBendStackEntry> {
        self.stacks.get(&channel).and_then(|s| s.last()).copied()
    }
}
