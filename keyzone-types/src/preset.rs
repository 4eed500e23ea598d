//! Preset hierarchy: 9 fixed layers, each holding manual mappings.
//! Zones are stored separately (they're global to the preset, each carrying
//! its own `layer_id`) — see `keyzone-core::preset::PresetStore` for the
//! observable container that owns both.

use serde::{Deserialize, Serialize};

use crate::ids::LAYER_COUNT;
use crate::mapping::Mapping;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub solo_layer: bool,
    pub passthru_inheritance: bool,
    pub private_to_layer: bool,
    pub mappings: Vec<Mapping>,
}

impl Layer {
    pub fn base() -> Self {
        Self {
            name: "Base".to_string(),
            solo_layer: false,
            passthru_inheritance: true,
            private_to_layer: false,
            mappings: Vec::new(),
        }
    }

    pub fn overlay(index: u8) -> Self {
        Self {
            name: format!("Overlay {index}"),
            solo_layer: false,
            passthru_inheritance: true,
            private_to_layer: false,
            mappings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub layers: [Layer; LAYER_COUNT],
}

impl Preset {
    pub fn new() -> Self {
        let mut layers: Vec<Layer> = vec![Layer::base()];
        for i in 1..LAYER_COUNT as u8 {
            layers.push(Layer::overlay(i));
        }
        Self {
            layers: layers.try_into().unwrap_or_else(|_| unreachable!()),
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preset_has_nine_layers_with_base_first() {
        let preset = Preset::new();
        assert_eq!(preset.layers.len(), LAYER_COUNT);
        assert_eq!(preset.layers[0].name, "Base");
        assert_eq!(preset.layers[1].name, "Overlay 1");
    }
}
