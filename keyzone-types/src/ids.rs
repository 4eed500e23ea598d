//! Identifiers shared across the compiled grids, runtime state, and dispatcher.

use serde::{Deserialize, Serialize};

/// Opaque hardware device handle, as delivered by the raw-input collaborator.
pub type DeviceHandle = u64;

/// OS virtual-key code, or one of the reserved pseudo-codes in [`crate::pseudo_codes`].
pub type KeyCode = i32;

/// Identifies a single physical input: one key on one device.
///
/// Multiple voices may share an `InputId` (a chord strummed from one key),
/// but a given `(device_handle, key_code)` pair is only ever produced by one
/// raw-input thread, so events for the same `InputId` are always ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputId {
    pub device_handle: DeviceHandle,
    pub key_code: KeyCode,
}

impl InputId {
    pub fn new(device_handle: DeviceHandle, key_code: KeyCode) -> Self {
        Self {
            device_handle,
            key_code,
        }
    }
}

/// Stable 64-bit hash of a device alias name. Zero is reserved for
/// "Any / Master" and matches every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasHash(pub u64);

impl AliasHash {
    pub const ANY: AliasHash = AliasHash(0);

    pub fn is_any(self) -> bool {
        self.0 == 0
    }

    /// Hash an alias name into a stable `AliasHash`. Reserved names
    /// ("Any / Master", "Global", "Unassigned") all collapse to `ANY`.
    pub fn of(name: &str) -> AliasHash {
        if matches!(name, "Any / Master" | "Global" | "Unassigned" | "") {
            return AliasHash::ANY;
        }
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        name.hash(&mut hasher);
        AliasHash(hasher.finish())
    }
}

/// Layer index, 0 (Base) through 8 (the eighth overlay).
pub type LayerId = u8;

/// Number of layers a preset always carries: layer 0 ("Base") plus 1..8 overlays.
pub const LAYER_COUNT: usize = 9;

/// Reserved pseudo key-codes for non-keyboard inputs.
pub mod pseudo_codes {
    use super::KeyCode;

    pub const SCROLL_UP: KeyCode = 0x1001;
    pub const SCROLL_DOWN: KeyCode = 0x1002;
    pub const POINTER_X: KeyCode = 0x2000;
    pub const POINTER_Y: KeyCode = 0x2001;

    // Generic modifier keys and their left/right specific counterparts, used
    // by the grid compiler's modifier-replication rule.
    pub const SHIFT_GENERIC: KeyCode = 0x1100;
    pub const SHIFT_LEFT: KeyCode = 0x1101;
    pub const SHIFT_RIGHT: KeyCode = 0x1102;
    pub const CONTROL_GENERIC: KeyCode = 0x1110;
    pub const CONTROL_LEFT: KeyCode = 0x1111;
    pub const CONTROL_RIGHT: KeyCode = 0x1112;
    pub const ALT_GENERIC: KeyCode = 0x1120;
    pub const ALT_LEFT: KeyCode = 0x1121;
    pub const ALT_RIGHT: KeyCode = 0x1122;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_alias_names_hash_to_any() {
        assert!(AliasHash::of("Any / Master").is_any());
        assert!(AliasHash::of("Global").is_any());
        assert!(AliasHash::of("Unassigned").is_any());
        assert!(AliasHash::of("").is_any());
    }

    #[test]
    fn distinct_names_hash_differently() {
        let a = AliasHash::of("Launchpad");
        let b = AliasHash::of("Nord");
        assert_ne!(a, b);
        assert!(!a.is_any());
    }

    #[test]
    fn same_name_hashes_stably() {
        assert_eq!(AliasHash::of("Launchpad"), AliasHash::of("Launchpad"));
    }
}
