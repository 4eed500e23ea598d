//! Chord generation: the diatonic stack and the voicing strategies that
//! re-arrange it. Raw stack by scale-degree arithmetic, then a voicing
//! pass that clusters, spreads, or projects the stack onto an instrument
//! idiom.

use keyzone_types::chord::{ChordType, Voicing};
use keyzone_types::ChordNote;

/// Standard guitar open tuning, low to high: E2 A2 D3 G3 B3 E4.
const GUITAR_OPEN_STRINGS: [i32; 6] = [40, 45, 50, 55, 59, 64];

/// `root + octave_shift*12 + intervals[scale_step]`, where `degree_index`
/// can run negative — octave shift and scale step both wrap correctly via
/// Euclidean division.
fn scale_degree_pitch(root: i32, intervals: &[i32], degree_index: i32) -> i32 {
    if intervals.is_empty() {
        return root;
    }
    let len = intervals.len() as i32;
    let octave_shift = degree_index.div_euclid(len);
    let scale_step = degree_index.rem_euclid(len) as usize;
    root + octave_shift * 12 + intervals[scale_step]
}

/// The raw (unvoiced) stack of pitches for a chord type, built from scale
/// degrees `degree_index`, `+2`, `+4`, `+6`, `+8` as the chord type calls for.
fn raw_stack(root: i32, intervals: &[i32], degree_index: i32, chord_type: ChordType) -> Vec<i32> {
    let offsets: &[i32] = match chord_type {
        ChordType::None => &[0],
        ChordType::Triad => &[0, 2, 4],
        ChordType::Seventh => &[0, 2, 4, 6],
        ChordType::Ninth => &[0, 2, 4, 6, 8],
        ChordType::Power5 => &[0, 4],
    };
    offsets
        .iter()
        .map(|&o| scale_degree_pitch(root, intervals, degree_index + o))
        .collect()
}

/// Cluster every note to within +-6 semitones of `center` by octave shifts
/// (max 20 shifts per note), then force the chord root's pitch class to be
/// the lowest-sounding note.
fn smooth(stack: &[i32], center: i32) -> Vec<i32> {
    let root_pc = stack[0].rem_euclid(12);
    let mut notes = stack.to_vec();
    for n in notes.iter_mut() {
        let mut shifts = 0;
        while *n - center > 6 && shifts < 20 {
            *n -= 12;
            shifts += 1;
        }
        let mut shifts = 0;
        while *n - center < -6 && shifts < 20 {
            *n += 12;
            shifts += 1;
        }
    }
    if let Some(&anchor) = notes.iter().filter(|&&n| n.rem_euclid(12) == root_pc).min() {
        for n in notes.iter_mut() {
            if n.rem_euclid(12) != root_pc {
                let mut shifts = 0;
                while *n < anchor && shifts < 20 {
                    *n += 12;
                    shifts += 1;
                }
            }
        }
    }
    notes.sort_unstable();
    notes
}

fn guitar_spread(stack: &[i32], chord_type: ChordType, zone_root: i32) -> Vec<i32> {
    let mut notes = stack.to_vec();
    match chord_type {
        ChordType::Triad => {
            if notes.len() > 1 {
                notes[1] += 12;
            }
        }
        ChordType::Seventh => {
            if notes.len() > 1 {
                notes[1] += 12;
            }
            if notes.len() > 3 {
                notes[3] += 12;
            }
        }
        ChordType::Ninth => {
            if notes.len() > 1 {
                notes[1] += 12;
            }
            if notes.len() > 3 {
                notes[3] += 12;
            }
            if notes.len() > 4 {
                notes[4] += 12;
            }
        }
        ChordType::None | ChordType::Power5 => {}
    }
    notes.sort_unstable();
    if let Some(&lowest) = notes.iter().min() {
        if lowest - zone_root > 5 {
            notes.iter_mut().for_each(|n| *n -= 12);
        } else if lowest - zone_root < -7 {
            notes.iter_mut().for_each(|n| *n += 12);
        }
    }
    notes.sort_unstable();
    notes
}

fn drop_from_top(stack: &[i32], n_from_top: usize) -> Vec<i32> {
    let mut notes = stack.to_vec();
    notes.sort_unstable();
    let len = notes.len();
    if len >= n_from_top {
        notes[len - n_from_top] -= 12;
    }
    notes.sort_unstable();
    notes
}

/// PianoClose: triads/power chords use the gravity well; sevenths/ninths
/// alternate between drop-3 (even scale degrees) and root position (odd).
fn piano_close(
    stack: &[i32],
    chord_type: ChordType,
    degree_index: i32,
    center: i32,
) -> Vec<i32> {
    match chord_type {
        ChordType::Triad | ChordType::Power5 | ChordType::None => smooth(stack, center),
        ChordType::Seventh | ChordType::Ninth => {
            if degree_index.rem_euclid(2) == 0 {
                smooth(&drop_from_top(stack, 3), center)
            } else {
                let mut notes = stack.to_vec();
                notes.sort_unstable();
                notes
            }
        }
    }
}

fn piano_open(stack: &[i32], center: i32) -> Vec<i32> {
    smooth(&drop_from_top(stack, 2), center)
}

/// Project chord pitch classes onto an emulated six-string open-tuning
/// fretboard, one tone per reachable string within `[fret_min, fret_max]`,
/// string order preserved low to high. Chords that don't fully fit the
/// window simply sound fewer tones — the source's behavior for an
/// unrealizable chord is preserved rather than treated as an error.
fn guitar_project(stack: &[i32], fret_min: i32, fret_max: i32) -> Vec<i32> {
    let pitch_classes: Vec<i32> = stack.iter().map(|&p| p.rem_euclid(12)).collect();
    let root_pc = pitch_classes[0];
    let mut root_on_a_string = false;
    let mut strings: Vec<(usize, i32)> = Vec::new();

    for (string_idx, &open) in GUITAR_OPEN_STRINGS.iter().enumerate() {
        let open_pc = open.rem_euclid(12);
        for &pc in &pitch_classes {
            let mut fret = (pc - open_pc).rem_euclid(12);
            while fret < fret_min {
                fret += 12;
            }
            if fret <= fret_max {
                if pc == root_pc && string_idx == 1 {
                    root_on_a_string = true;
                }
                strings.push((string_idx, open + fret));
                break;
            }
        }
    }

    if root_on_a_string {
        strings.retain(|&(string_idx, _)| string_idx != 0);
    }
    strings.sort_by_key(|&(string_idx, _)| string_idx);
    strings.into_iter().map(|(_, pitch)| pitch).collect()
}

/// Insert ghost notes into gaps wider than 4 semitones between adjacent
/// voiced tones. Strict mode only inserts pitches that belong to the
/// scale; otherwise a single midpoint ghost fills the gap.
fn fill_ghost_notes(notes: &[i32], root_pc: i32, intervals: &[i32], strict: bool) -> Vec<ChordNote> {
    let mut sorted = notes.to_vec();
    sorted.sort_unstable();
    let mut filled = Vec::new();
    for window in sorted.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        filled.push(ChordNote::new(lo));
        let gap = hi - lo;
        if gap > 4 {
            if strict {
                for p in (lo + 1)..hi {
                    let in_scale = intervals
                        .iter()
                        .any(|&iv| (root_pc + iv).rem_euclid(12) == p.rem_euclid(12));
                    if in_scale {
                        filled.push(ChordNote::ghost(p));
                    }
                }
            } else {
                filled.push(ChordNote::ghost(lo + gap / 2));
            }
        }
    }
    if let Some(&last) = sorted.last() {
        filled.push(ChordNote::new(last));
    }
    filled.sort_by_key(|n| n.pitch);
    filled
}

/// Generate the voiced chord for a single zone key press. `zone_root` is
/// the zone's effective root (used as the gravity-well/gravity-fold
/// center); it is independent of `root` so `voicing_magnet_semitones` can
/// shift the clustering target without moving the chord's actual root.
#[allow(clippy::too_many_arguments)]
pub fn generate_chord(
    root: i32,
    intervals: &[i32],
    degree_index: i32,
    chord_type: ChordType,
    voicing: Voicing,
    zone_root: i32,
    ghost_fill: bool,
    strict_ghost_harmony: bool,
) -> Vec<ChordNote> {
    let stack = raw_stack(root, intervals, degree_index, chord_type);
    let root_pc = stack[0].rem_euclid(12);

    let voiced = match voicing {
        Voicing::RootPosition | Voicing::PianoBlock => {
            let mut v = stack.clone();
            v.sort_unstable();
            v
        }
        Voicing::Smooth { magnet_semitones } => smooth(&stack, zone_root + magnet_semitones),
        Voicing::GuitarSpread => guitar_spread(&stack, chord_type, zone_root),
        Voicing::PianoClose { magnet_semitones } => {
            piano_close(&stack, chord_type, degree_index, zone_root + magnet_semitones)
        }
        Voicing::PianoOpen { magnet_semitones } => {
            piano_open(&stack, zone_root + magnet_semitones)
        }
        Voicing::GuitarCampfire => guitar_project(&stack, 0, 4),
        Voicing::GuitarRhythm { fret_anchor } => {
            guitar_project(&stack, fret_anchor, fret_anchor + 3)
        }
    };

    let mut notes = if ghost_fill {
        fill_ghost_notes(&voiced, root_pc, intervals, strict_ghost_harmony)
    } else {
        voiced.into_iter().map(ChordNote::new).collect()
    };
    notes.sort_by_key(|n| n.pitch);
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAJOR: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

    #[test]
    fn root_position_triad_is_nondecreasing_and_in_range() {
        let notes = generate_chord(
            60,
            &MAJOR,
            0,
            ChordType::Triad,
            Voicing::RootPosition,
            60,
            false,
            true,
        );
        let pitches: Vec<i32> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64, 67]);
        assert!(pitches.windows(2).all(|w| w[0] <= w[1]));
        assert!(pitches.iter().all(|&p| (0..=127).contains(&p)));
    }

    #[test]
    fn none_chord_type_returns_single_note() {
        let notes = generate_chord(
            60,
            &MAJOR,
            0,
            ChordType::None,
            Voicing::RootPosition,
            60,
            false,
            true,
        );
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 60);
    }

    #[test]
    fn smooth_keeps_root_pitch_class_lowest() {
        let notes = generate_chord(
            60,
            &MAJOR,
            4, // third-degree chord: wide spread before clustering
            ChordType::Seventh,
            Voicing::Smooth { magnet_semitones: 0 },
            60,
            false,
            true,
        );
        let pitches: Vec<i32> = notes.iter().map(|n| n.pitch).collect();
        let root_pc = pitches[0].rem_euclid(12);
        let min = *pitches.iter().min().unwrap();
        assert_eq!(min.rem_euclid(12), root_pc);
    }

    #[test]
    fn guitar_spread_gravity_folds_toward_zone_root() {
        let notes = generate_chord(
            84,
            &MAJOR,
            0,
            ChordType::Triad,
            Voicing::GuitarSpread,
            60,
            false,
            true,
        );
        let lowest = notes.iter().map(|n| n.pitch).min().unwrap();
        assert!(lowest - 60 <= 5);
    }

    #[test]
    fn guitar_campfire_emits_only_reachable_tones() {
        let notes = generate_chord(
            60,
            &MAJOR,
            0,
            ChordType::Triad,
            Voicing::GuitarCampfire,
            60,
            false,
            true,
        );
        assert!(!notes.is_empty());
        assert!(notes.len() <= 6);
    }

    #[test]
    fn ghost_fill_marks_inserted_notes() {
        let notes = generate_chord(
            60,
            &MAJOR,
            0,
            ChordType::Power5,
            Voicing::RootPosition,
            60,
            true,
            false,
        );
        assert!(notes.iter().any(|n| n.is_ghost));
    }

    #[test]
    fn negative_degree_index_wraps_correctly() {
        let notes = generate_chord(
            60,
            &MAJOR,
            -3,
            ChordType::Triad,
            Voicing::RootPosition,
            60,
            false,
            true,
        );
        assert!(notes.iter().all(|n| (0..=127).contains(&n.pitch)));
    }
}
