//! Device alias management: create/rename/delete/assign, with rename
//! rewriting every mapping that referenced the old name. The rewrite set
//! is collected before any mutation — we never mutate a layer's mapping
//! list while iterating it.

use keyzone_types::alias::{is_reserved_name, DeviceAlias, DeviceAliasTable};
use keyzone_types::ids::{AliasHash, DeviceHandle};
use keyzone_types::preset::Preset;

use crate::error::{KeyzoneError, Result};

pub struct AliasTable {
    table: DeviceAliasTable,
}

impl AliasTable {
    pub fn new() -> Self {
        Self {
            table: DeviceAliasTable::new(),
        }
    }

    pub fn table(&self) -> &DeviceAliasTable {
        &self.table
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        if is_reserved_name(name) {
            return Err(KeyzoneError::ReservedAliasName(name.to_string()));
        }
        if self.table.find_by_name(name).is_some() {
            return Err(KeyzoneError::DuplicateAliasName(name.to_string()));
        }
        self.table.aliases.push(DeviceAlias {
            name: name.to_string(),
            hardware_ids: Vec::new(),
        });
        Ok(())
    }

    pub fn delete(&mut self, name: &str) {
        self.table.aliases.retain(|a| a.name != name);
    }

    pub fn assign_hardware(&mut self, name: &str, handle: DeviceHandle) -> Result<()> {
        let alias = self
            .table
            .aliases
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| KeyzoneError::UnknownAlias(name.to_string()))?;
        if !alias.hardware_ids.contains(&handle) {
            alias.hardware_ids.push(handle);
        }
        Ok(())
    }

    pub fn unassign_hardware(&mut self, name: &str, handle: DeviceHandle) {
        if let Some(alias) = self.table.aliases.iter_mut().find(|a| a.name == name) {
            alias.hardware_ids.retain(|&h| h != handle);
        }
    }

    /// Rename `old_name` to `new_name`, rewriting every mapping in
    /// `preset` that targeted the old name by string.
    pub fn rename(&mut self, old_name: &str, new_name: &str, preset: &mut Preset) -> Result<()> {
        if is_reserved_name(new_name) {
            return Err(KeyzoneError::ReservedAliasName(new_name.to_string()));
        }
        if self.table.find_by_name(new_name).is_some() {
            return Err(KeyzoneError::DuplicateAliasName(new_name.to_string()));
        }
        let alias = self
            .table
            .aliases
            .iter_mut()
            .find(|a| a.name == old_name)
            .ok_or_else(|| KeyzoneError::UnknownAlias(old_name.to_string()))?;
        alias.name = new_name.to_string();

        for layer in preset.layers.iter_mut() {
            let to_rewrite: Vec<usize> = layer
                .mappings
                .iter()
                .enumerate()
                .filter(|(_, m)| m.input_alias == old_name)
                .map(|(i, _)| i)
                .collect();
            for idx in to_rewrite {
                layer.mappings[idx].input_alias = new_name.to_string();
            }
        }
        Ok(())
    }

    /// Resolve a hardware device to its alias hash, falling back to `ANY`
    /// when unassigned — a deleted alias's mappings are silently
    /// retargeted this way on next compile.
    pub fn resolve(&self, device_handle: DeviceHandle) -> AliasHash {
        match self.table.find_by_hardware_id(device_handle) {
            Some(alias) => AliasHash::of(&alias.name),
            None => AliasHash::ANY,
        }
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyzone_types::mapping::{Action, Mapping, NoteAction};

    #[test]
    fn reserved_names_are_rejected() {
        let mut aliases = AliasTable::new();
        assert!(aliases.create("Global").is_err());
        assert!(aliases.create("Any / Master").is_err());
    }

    #[test]
    fn rename_rewrites_every_referencing_mapping() {
        let mut aliases = AliasTable::new();
        aliases.create("Launchpad").unwrap();
        let mut preset = Preset::new();
        let mut mapping = Mapping::new(0x51, 0, Action::Note(NoteAction::default()));
        mapping.input_alias = "Launchpad".to_string();
        preset.layers[0].mappings.push(mapping);

        aliases.rename("Launchpad", "Nord", &mut preset).unwrap();

        assert_eq!(preset.layers[0].mappings[0].input_alias, "Nord");
        assert!(aliases.table().find_by_name("Nord").is_some());
        assert!(aliases.table().find_by_name("Launchpad").is_none());
    }

    #[test]
    fn unassigned_device_resolves_to_any() {
        let aliases = AliasTable::new();
        assert!(aliases.resolve(999).is_any());
    }
}
