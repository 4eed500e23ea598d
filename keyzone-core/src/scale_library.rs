//! Named scale storage: factory scales (immutable) plus user scales, with
//! lookup that never fails — an unknown name falls back to Major.

use keyzone_types::music::{factory_scales, Scale};

use crate::error::{KeyzoneError, Result};

pub struct ScaleLibrary {
    scales: Vec<Scale>,
}

impl ScaleLibrary {
    pub fn with_factory_defaults() -> Self {
        Self {
            scales: factory_scales(),
        }
    }

    pub fn has_scale(&self, name: &str) -> bool {
        self.scales.iter().any(|s| s.name == name)
    }

    /// Intervals for `name`, falling back to Major. Never fails — an
    /// unknown scale name still yields a playable result.
    pub fn intervals(&self, name: &str) -> &[i32] {
        self.scales
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.scales.iter().find(|s| s.name == "Major"))
            .map(|s| s.intervals.as_slice())
            .unwrap_or(&[])
    }

    pub fn create_scale(&mut self, scale: Scale) -> Result<()> {
        if self.has_scale(&scale.name) {
            return Err(KeyzoneError::DuplicateScaleName(scale.name));
        }
        self.scales.push(scale);
        Ok(())
    }

    pub fn delete_scale(&mut self, name: &str) -> Result<()> {
        match self.scales.iter().find(|s| s.name == name) {
            Some(s) if s.is_factory => {
                Err(KeyzoneError::FactoryScaleImmutable(name.to_string()))
            }
            Some(_) => {
                self.scales.retain(|s| s.name != name);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn scales(&self) -> &[Scale] {
        &self.scales
    }
}

impl Default for ScaleLibrary {
    fn default() -> Self {
        Self::with_factory_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scale_falls_back_to_major() {
        let lib = ScaleLibrary::with_factory_defaults();
        assert_eq!(lib.intervals("Nonexistent"), lib.intervals("Major"));
    }

    #[test]
    fn factory_scales_cannot_be_deleted() {
        let mut lib = ScaleLibrary::with_factory_defaults();
        assert!(lib.delete_scale("Major").is_err());
        assert!(lib.has_scale("Major"));
    }

    #[test]
    fn user_scale_create_and_delete_roundtrip() {
        let mut lib = ScaleLibrary::with_factory_defaults();
        lib.create_scale(Scale::user("Whole Tone", vec![0, 2, 4, 6, 8, 10]))
            .unwrap();
        assert!(lib.has_scale("Whole Tone"));
        assert!(lib
            .create_scale(Scale::user("Whole Tone", vec![0, 2]))
            .is_err());
        lib.delete_scale("Whole Tone").unwrap();
        assert!(!lib.has_scale("Whole Tone"));
    }
}
