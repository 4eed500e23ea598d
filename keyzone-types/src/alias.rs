//! Device alias table: user-named groups of hardware device identifiers.
//! Mutation logic (rename rewriting mappings, reserved names) lives in
//! `keyzone-core::alias_table`; this is the stored shape.

use serde::{Deserialize, Serialize};

use crate::ids::DeviceHandle;

pub const RESERVED_ALIAS_NAMES: &[&str] = &["Any / Master", "Global", "Unassigned"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAlias {
    pub name: String,
    pub hardware_ids: Vec<DeviceHandle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceAliasTable {
    pub aliases: Vec<DeviceAlias>,
}

impl DeviceAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&DeviceAlias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    pub fn find_by_hardware_id(&self, handle: DeviceHandle) -> Option<&DeviceAlias> {
        self.aliases
            .iter()
            .find(|a| a.hardware_ids.contains(&handle))
    }
}

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_ALIAS_NAMES.contains(&name)
}
