//! Observable preset store: owns the layer hierarchy and the (preset-wide)
//! zone list, firing at most one change event per mutation batch.
//!
//! A plain owned data model plus an explicit listener list and a
//! `begin_transaction`/`end_transaction` scope that coalesces bursts.

use keyzone_types::ids::LayerId;
use keyzone_types::mapping::Mapping;
use keyzone_types::preset::Preset;
use keyzone_types::zone::Zone;

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub paths: Vec<String>,
}

pub type Listener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

pub struct PresetStore {
    preset: Preset,
    zones: Vec<Zone>,
    listeners: Vec<Listener>,
    pending_paths: Vec<String>,
    transaction_depth: u32,
}

impl PresetStore {
    pub fn new() -> Self {
        Self {
            preset: Preset::new(),
            zones: Vec::new(),
            listeners: Vec::new(),
            pending_paths: Vec::new(),
            transaction_depth: 0,
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zones_for_layer(&self, layer_id: LayerId) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.layer_id == layer_id)
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Defer notification until the matching `end_transaction`, coalescing
    /// any number of mutations into a single event.
    pub fn begin_transaction(&mut self) {
        self.transaction_depth += 1;
    }

    pub fn end_transaction(&mut self) {
        if self.transaction_depth == 0 {
            return;
        }
        self.transaction_depth -= 1;
        if self.transaction_depth == 0 {
            self.flush();
        }
    }

    fn notify(&mut self, path: &str) {
        self.pending_paths.push(path.to_string());
        if self.transaction_depth == 0 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending_paths.is_empty() {
            return;
        }
        let event = ChangeEvent {
            paths: std::mem::take(&mut self.pending_paths),
        };
        for listener in &self.listeners {
            listener(&event);
        }
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.push(zone);
        self.notify("zones");
    }

    pub fn remove_zone(&mut self, index: usize) {
        if index < self.zones.len() {
            self.zones.remove(index);
            self.notify("zones");
        }
    }

    pub fn zone_mut(&mut self, index: usize) -> Option<&mut Zone> {
        self.zones.get_mut(index)
    }

    pub fn add_mapping(&mut self, layer: LayerId, mapping: Mapping) {
        if let Some(l) = self.preset.layers.get_mut(layer as usize) {
            l.mappings.push(mapping);
            self.notify("mappings");
        }
    }

    pub fn remove_mapping(&mut self, layer: LayerId, index: usize) {
        if let Some(l) = self.preset.layers.get_mut(layer as usize) {
            if index < l.mappings.len() {
                l.mappings.remove(index);
                self.notify("mappings");
            }
        }
    }

    pub fn set_layer_solo(&mut self, layer: LayerId, solo: bool) {
        if let Some(l) = self.preset.layers.get_mut(layer as usize) {
            l.solo_layer = solo;
            self.notify("layers");
        }
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn transaction_coalesces_multiple_mutations_into_one_event() {
        let mut store = PresetStore::new();
        let fire_count = Arc::new(AtomicUsize::new(0));
        let counter = fire_count.clone();
        store.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.begin_transaction();
        store.add_zone(Zone::new("A", 0));
        store.add_zone(Zone::new("B", 0));
        store.add_mapping(0, Mapping::new(0x51, 0, keyzone_types::mapping::Action::Note(Default::default())));
        assert_eq!(fire_count.load(Ordering::SeqCst), 0);
        store.end_transaction();

        assert_eq!(fire_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.zones().len(), 2);
    }

    #[test]
    fn untransacted_mutation_fires_immediately() {
        let mut store = PresetStore::new();
        let fire_count = Arc::new(AtomicUsize::new(0));
        let counter = fire_count.clone();
        store.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.add_zone(Zone::new("A", 0));
        assert_eq!(fire_count.load(Ordering::SeqCst), 1);
    }
}
