//! Zone note generation: resolves a key press against a zone's layout
//! strategy, chord type, and voicing, with a degree cache so `note_on`
//! never re-walks the layout table on the hot path.
//!
//! Also home to the rhythm analyzer that drives adaptive glide (window =
//! last 8 inter-tap intervals).

use std::collections::{HashMap, VecDeque};

use keyzone_types::chord::{GuitarPlayerPosition, PianoVoicingStyle, Voicing};
use keyzone_types::ids::KeyCode;
use keyzone_types::zone::{LayoutStrategy, VoicingConfig, Zone};
use keyzone_types::ChordNote;

use crate::chord::generate_chord;
use crate::layout::{KeyboardLayout, PhysicalPosition};
use crate::scale_library::ScaleLibrary;

#[derive(Debug, Clone, Copy)]
struct CachedEntry {
    degree_index: i32,
    /// +1 for a Piano-layout black key (the sharp of its nearest-left white key).
    chromatic_bump: i32,
}

pub struct ZoneRuntime {
    pub zone: Zone,
    cache: HashMap<KeyCode, CachedEntry>,
    resolved_root: i32,
    resolved_intervals: Vec<i32>,
    pub rhythm: RhythmAnalyzer,
}

impl ZoneRuntime {
    pub fn new(zone: Zone) -> Self {
        let resolved_root = zone.root_note as i32;
        Self {
            zone,
            cache: HashMap::new(),
            resolved_root,
            resolved_intervals: Vec::new(),
            rhythm: RhythmAnalyzer::new(),
        }
    }

    fn voicing(&self) -> Voicing {
        match self.zone.voicing {
            VoicingConfig::Piano {
                style,
                magnet_semitones,
            } => match style {
                PianoVoicingStyle::Block => Voicing::PianoBlock,
                PianoVoicingStyle::Close => Voicing::PianoClose { magnet_semitones },
                PianoVoicingStyle::Open => Voicing::PianoOpen { magnet_semitones },
            },
            VoicingConfig::Guitar {
                position,
                fret_anchor,
            } => match position {
                GuitarPlayerPosition::Campfire => Voicing::GuitarCampfire,
                GuitarPlayerPosition::Rhythm => Voicing::GuitarRhythm { fret_anchor },
            },
        }
    }

    /// Rebuild the key -> degree cache. Call on registration and whenever
    /// any property that affects note generation changes: tuning, chord,
    /// voicing, instrument, layout, key-set, or global root/scale when the
    /// zone follows them.
    pub fn rebuild_cache(
        &mut self,
        scales: &ScaleLibrary,
        layout: &KeyboardLayout,
        global_root: u8,
        global_scale_name: &str,
    ) {
        self.cache.clear();
        self.resolved_root = self.zone.effective_root(global_root);
        let scale_name = if self.zone.use_global_scale {
            global_scale_name
        } else {
            self.zone.scale_name.as_str()
        };
        self.resolved_intervals = scales.intervals(scale_name).to_vec();

        match self.zone.layout_strategy {
            LayoutStrategy::Linear => self.rebuild_linear_cache(),
            LayoutStrategy::Grid => self.rebuild_grid_cache(layout),
            LayoutStrategy::Piano => self.rebuild_piano_cache(layout),
        }
    }

    fn rebuild_linear_cache(&mut self) {
        for (i, &key) in self.zone.input_key_codes.iter().enumerate() {
            self.cache.insert(
                key,
                CachedEntry {
                    degree_index: i as i32 + self.zone.degree_offset,
                    chromatic_bump: 0,
                },
            );
        }
    }

    fn rebuild_grid_cache(&mut self, layout: &KeyboardLayout) {
        let anchor_pos = self
            .zone
            .input_key_codes
            .first()
            .and_then(|&k| layout.position_of(k));
        for (i, &key) in self.zone.input_key_codes.iter().enumerate() {
            let degree = match (anchor_pos, layout.position_of(key)) {
                (Some(a), Some(k)) => {
                    (k.col - a.col) + (k.row - a.row) * self.zone.grid_interval
                }
                // Key absent from the physical layout table: fall back to
                // the zone's plain left-to-right order.
                _ => i as i32,
            };
            self.cache.insert(
                key,
                CachedEntry {
                    degree_index: degree + self.zone.degree_offset,
                    chromatic_bump: 0,
                },
            );
        }
    }

    fn rebuild_piano_cache(&mut self, layout: &KeyboardLayout) {
        let positioned: Vec<(KeyCode, PhysicalPosition)> = self
            .zone
            .input_key_codes
            .iter()
            .filter_map(|&k| layout.position_of(k).map(|p| (k, p)))
            .collect();
        let Some(min_row) = positioned.iter().map(|(_, p)| p.row).min() else {
            return;
        };

        let mut white: Vec<(KeyCode, PhysicalPosition)> = positioned
            .iter()
            .copied()
            .filter(|(_, p)| p.row == min_row)
            .collect();
        white.sort_by_key(|(_, p)| p.col);

        let mut black: Vec<(KeyCode, PhysicalPosition)> = positioned
            .iter()
            .copied()
            .filter(|(_, p)| p.row != min_row)
            .collect();
        black.sort_by_key(|(_, p)| p.col);

        for (idx, (key, _)) in white.iter().enumerate() {
            self.cache.insert(
                *key,
                CachedEntry {
                    degree_index: idx as i32 + self.zone.degree_offset,
                    chromatic_bump: 0,
                },
            );
        }

        for (key, pos) in &black {
            let nearest_left = white
                .iter()
                .enumerate()
                .rev()
                .find(|(_, (_, wp))| wp.col <= pos.col);
            let Some((white_idx, _)) = nearest_left else {
                continue;
            };
            // White diatonic positions E (2) and B (6) have no sharp.
            if matches!(white_idx % 7, 2 | 6) {
                continue;
            }
            self.cache.insert(
                *key,
                CachedEntry {
                    degree_index: white_idx as i32 + self.zone.degree_offset,
                    chromatic_bump: 1,
                },
            );
        }
    }

    /// Ghost-fill is applied whenever the zone voices a chord at all; a
    /// single note (`ChordType::None`) never gets ghost notes.
    fn ghost_fill_enabled(&self) -> bool {
        !matches!(self.zone.chord_type, keyzone_types::chord::ChordType::None)
    }

    /// Resolve the zone's output for `key_code`. Global transpose is
    /// applied here, not baked into the cache, so a single transpose
    /// change doesn't force a cache rebuild.
    pub fn get_notes_for_key(
        &self,
        key_code: KeyCode,
        global_chromatic_transpose: i32,
        global_degree_transpose: i32,
    ) -> Option<Vec<ChordNote>> {
        let entry = *self.cache.get(&key_code)?;

        let degree_transpose = if self.zone.ignore_global_transpose {
            0
        } else {
            global_degree_transpose
        };

        let mut notes = generate_chord(
            self.resolved_root,
            &self.resolved_intervals,
            entry.degree_index + degree_transpose,
            self.zone.chord_type,
            self.voicing(),
            self.resolved_root,
            self.ghost_fill_enabled(),
            self.zone.strict_ghost_harmony,
        );

        if entry.chromatic_bump != 0 {
            for note in notes.iter_mut() {
                note.pitch += entry.chromatic_bump;
            }
        }

        if self.zone.add_bass_note {
            let bass_pitch = self.resolved_root + 12 * self.zone.bass_octave_offset;
            notes.insert(0, ChordNote::new(bass_pitch));
        }

        let chromatic_transpose = if self.zone.ignore_global_transpose {
            0
        } else {
            global_chromatic_transpose
        };
        if chromatic_transpose != 0 {
            for note in notes.iter_mut() {
                note.pitch += chromatic_transpose;
            }
        }

        // Final step, unconditional: every returned pitch lands in 0..127
        // regardless of which branches above actually fired.
        for note in notes.iter_mut() {
            note.pitch = note.pitch.clamp(0, 127);
        }

        notes.sort_by_key(|n| n.pitch);
        Some(notes)
    }
}

/// Tracks the last few inter-keypress intervals for one zone's adaptive
/// glide time.
pub struct RhythmAnalyzer {
    taps: VecDeque<u64>,
}

impl RhythmAnalyzer {
    const WINDOW: usize = 8;

    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(Self::WINDOW),
        }
    }

    pub fn record_tap(&mut self, now_ms: u64) {
        self.taps.push_back(now_ms);
        if self.taps.len() > Self::WINDOW {
            self.taps.pop_front();
        }
    }

    pub fn average_interval_ms(&self) -> Option<u64> {
        if self.taps.len() < 2 {
            return None;
        }
        let diffs: Vec<u64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(a, b)| b.saturating_sub(*a))
            .collect();
        Some(diffs.iter().sum::<u64>() / diffs.len() as u64)
    }

    /// Glide time derived from recent tap tempo, clamped to the zone's
    /// configured maximum.
    pub fn adaptive_glide_ms(&self, max_glide_ms: u32) -> u32 {
        match self.average_interval_ms() {
            Some(avg) => (avg as u32).min(max_glide_ms),
            None => max_glide_ms,
        }
    }
}

impl Default for RhythmAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
