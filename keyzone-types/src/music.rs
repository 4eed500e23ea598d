//! Scale definitions: named, ordered interval sets relative to a root.

use serde::{Deserialize, Serialize};

/// A named scale as a non-empty, strictly increasing, deduplicated set of
/// semitone offsets from the root (0..11).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub name: String,
    pub intervals: Vec<i32>,
    /// Factory scales can't be mutated or removed from the library.
    pub is_factory: bool,
}

impl Scale {
    pub fn factory(name: &str, intervals: &[i32]) -> Self {
        Self {
            name: name.to_string(),
            intervals: intervals.to_vec(),
            is_factory: true,
        }
    }

    pub fn user(name: impl Into<String>, intervals: Vec<i32>) -> Self {
        Self {
            name: name.into(),
            intervals,
            is_factory: false,
        }
    }

    /// A scale is well-formed when its intervals are non-empty, strictly
    /// increasing, and fall within one octave.
    pub fn is_valid(&self) -> bool {
        if self.intervals.is_empty() {
            return false;
        }
        self.intervals.windows(2).all(|w| w[0] < w[1])
            && self.intervals.iter().all(|&i| (0..12).contains(&i))
    }
}

/// The eleven factory-preset scales shipped by default, plus Chromatic.
pub fn factory_scales() -> Vec<Scale> {
    vec![
        Scale::factory("Major", &[0, 2, 4, 5, 7, 9, 11]),
        Scale::factory("Minor", &[0, 2, 3, 5, 7, 8, 10]),
        Scale::factory("Dorian", &[0, 2, 3, 5, 7, 9, 10]),
        Scale::factory("Phrygian", &[0, 1, 3, 5, 7, 8, 10]),
        Scale::factory("Lydian", &[0, 2, 4, 6, 7, 9, 11]),
        Scale::factory("Mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
        Scale::factory("Aeolian", &[0, 2, 3, 5, 7, 8, 10]),
        Scale::factory("Locrian", &[0, 1, 3, 5, 6, 8, 10]),
        Scale::factory("Pentatonic", &[0, 2, 4, 7, 9]),
        Scale::factory("Blues", &[0, 3, 5, 6, 7, 10]),
        Scale::factory("Chromatic", &(0..12).collect::<Vec<_>>()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_scales_are_valid() {
        for scale in factory_scales() {
            assert!(scale.is_valid(), "{} failed validation", scale.name);
            assert!(scale.is_factory);
        }
    }

    #[test]
    fn rejects_non_increasing_intervals() {
        let bad = Scale::user("bad", vec![0, 4, 2]);
        assert!(!bad.is_valid());
    }

    #[test]
    fn rejects_empty_intervals() {
        let bad = Scale::user("empty", vec![]);
        assert!(!bad.is_valid());
    }
}
