//! The compiler's output: dense per-layer audio/visual grids plus the
//! shared chord pool.
//!
//! Grids are indexed by key-code 0..255, which covers every OS
//! virtual-key code but not the pseudo-codes reserved for scroll wheels,
//! pointer axes, and touchpad events (values from `0x1001` up). Those
//! never appear in the dense array; each grid keeps a small sparse overflow
//! map for them so a single key-code lookup (`AudioGrid::get`) still covers
//! every input without inflating the dense array to a 64K-entry table for a
//! handful of codes above 255.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AliasHash, KeyCode, LayerId};
use crate::mapping::Action;

pub const DENSE_GRID_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualState {
    Empty,
    Active,
    Inherited,
    Override,
    Conflict,
}

/// How a zone's chord should be released into the strum scheduler,
/// baked at compile time so the dispatcher never has to re-walk zones
/// on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrumConfig {
    pub speed_ms: u32,
    pub pattern: crate::zone::StrumPattern,
    pub humanize_ms: u32,
    pub allow_sustain: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioSlot {
    pub active: bool,
    pub action: Option<Action>,
    /// Index into `CompiledContext::chord_pool`, or -1 for a monophonic note.
    pub chord_index: i32,
    /// `Some` when this slot's zone plays in Strum mode; `None` means
    /// Direct play (fire every chord note simultaneously).
    pub strum: Option<StrumConfig>,
    /// Baked from the zone's `ReleaseMode::Normal { delay_release_on,
    /// release_duration_ms, .. }`; 0 means release on key-up fires
    /// immediately.
    pub release_delay_ms: u32,
}

impl AudioSlot {
    pub fn empty() -> Self {
        Self {
            active: false,
            action: None,
            chord_index: -1,
            strum: None,
            release_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSlot {
    pub state: VisualState,
    /// RGBA-ish packed color; alpha is folded into the low byte by convention.
    pub color: u32,
    pub label: String,
    pub source_name: String,
}

impl Default for VisualSlot {
    fn default() -> Self {
        Self {
            state: VisualState::Empty,
            color: 0,
            label: String::new(),
            source_name: String::new(),
        }
    }
}

fn key_index(key_code: KeyCode) -> Option<usize> {
    if (0..DENSE_GRID_SIZE as i32).contains(&key_code) {
        Some(key_code as usize)
    } else {
        None
    }
}

/// A single layer's worth of per-key slots, dense for ordinary key codes
/// with a sparse overflow for pseudo-codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotGrid<T> {
    dense: Vec<T>,
    sparse: HashMap<KeyCode, T>,
}

impl<T: Clone + Default> SlotGrid<T> {
    pub fn new() -> Self {
        Self {
            dense: vec![T::default(); DENSE_GRID_SIZE],
            sparse: HashMap::new(),
        }
    }

    pub fn get(&self, key_code: KeyCode) -> Option<&T> {
        match key_index(key_code) {
            Some(i) => Some(&self.dense[i]),
            None => self.sparse.get(&key_code),
        }
    }

    pub fn get_mut(&mut self, key_code: KeyCode) -> &mut T {
        match key_index(key_code) {
            Some(i) => &mut self.dense[i],
            None => self.sparse.entry(key_code).or_insert_with(T::default),
        }
    }

    pub fn set(&mut self, key_code: KeyCode, value: T) {
        *self.get_mut(key_code) = value;
    }

    /// Iterate every touched key code in dense order, then sparse.
    pub fn iter(&self) -> impl Iterator<Item = (KeyCode, &T)> {
        self.dense
            .iter()
            .enumerate()
            .map(|(i, v)| (i as KeyCode, v))
            .chain(self.sparse.iter().map(|(&k, v)| (k, v)))
    }

    /// Visit every slot (dense then sparse) by mutable reference, for the
    /// compiler's inheritance-dimming pass.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(KeyCode, &mut T)) {
        for (i, v) in self.dense.iter_mut().enumerate() {
            f(i as KeyCode, v);
        }
        for (&k, v) in self.sparse.iter_mut() {
            f(k, v);
        }
    }
}

impl<T: Clone + Default> Default for SlotGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type AudioGrid = SlotGrid<AudioSlot>;
pub type VisualGrid = SlotGrid<VisualSlot>;

/// One ordered vector of notes to sound together, referenced by index from
/// `AudioSlot::chord_index`.
pub type ChordVoicing = Vec<crate::chord::ChordNote>;

/// Immutable snapshot produced by the grid compiler. Published by
/// atomic handoff — see `keyzone-core::compiler::CompiledContextHandle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledContext {
    /// Global (alias 0) audio grids, one per layer.
    pub global_audio_grids: Vec<AudioGrid>,
    /// Global visual grids, one per layer.
    pub global_visual_grids: Vec<VisualGrid>,
    /// Device-specific audio grids, keyed by alias then layer.
    pub device_audio_grids: HashMap<AliasHash, Vec<AudioGrid>>,
    /// Device-specific visual grids, keyed by alias then layer.
    pub device_visual_grids: HashMap<AliasHash, Vec<VisualGrid>>,
    /// Chord voicings referenced by `AudioSlot::chord_index`.
    pub chord_pool: Vec<ChordVoicing>,
}

impl CompiledContext {
    pub fn empty(layer_count: usize) -> Self {
        Self {
            global_audio_grids: (0..layer_count).map(|_| AudioGrid::new()).collect(),
            global_visual_grids: (0..layer_count).map(|_| VisualGrid::new()).collect(),
            device_audio_grids: HashMap::new(),
            device_visual_grids: HashMap::new(),
            chord_pool: Vec::new(),
        }
    }

    /// Resolve the audio grid for `alias` at layer `layer`, falling back to
    /// the global grid if no device-specific grid exists for that alias.
    pub fn audio_grid(&self, alias: AliasHash, layer: LayerId) -> Option<&AudioGrid> {
        if !alias.is_any() {
            if let Some(device_grids) = self.device_audio_grids.get(&alias) {
                return device_grids.get(layer as usize);
            }
        }
        self.global_audio_grids.get(layer as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_slot_roundtrip() {
        let mut grid: AudioGrid = SlotGrid::new();
        grid.set(65, AudioSlot { active: true, action: None, chord_index: -1, strum: None, release_delay_ms: 0 });
        assert!(grid.get(65).unwrap().active);
        assert!(!grid.get(66).unwrap().active);
    }

    #[test]
    fn sparse_overflow_for_pseudo_codes() {
        let mut grid: AudioGrid = SlotGrid::new();
        grid.set(0x1001, AudioSlot { active: true, action: None, chord_index: -1, strum: None, release_delay_ms: 0 });
        assert!(grid.get(0x1001).unwrap().active);
        assert!(grid.get(0x1002).is_none());
    }

    #[test]
    fn compiled_context_falls_back_to_global_grid() {
        let ctx = CompiledContext::empty(9);
        let alias = AliasHash(42);
        assert!(ctx.audio_grid(alias, 0).is_some());
    }
}
