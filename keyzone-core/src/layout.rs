//! The ambient physical-keyboard layout table consulted by the Grid and
//! Piano zone layout strategies. Key codes here are ASCII key characters,
//! the convention the raw-input collaborator uses for standard keyboard
//! rows.

use std::collections::HashMap;

use keyzone_types::ids::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalPosition {
    pub row: i32,
    pub col: i32,
}

/// US QWERTY rows, top to bottom, left to right.
const QWERTY_ROWS: [&str; 4] = ["1234567890", "QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM"];

pub struct KeyboardLayout {
    positions: HashMap<KeyCode, PhysicalPosition>,
}

impl KeyboardLayout {
    pub fn qwerty() -> Self {
        let mut positions = HashMap::new();
        for (row_index, row) in QWERTY_ROWS.iter().enumerate() {
            for (col_index, ch) in row.chars().enumerate() {
                positions.insert(
                    ch as KeyCode,
                    PhysicalPosition {
                        row: row_index as i32,
                        col: col_index as i32,
                    },
                );
            }
        }
        Self { positions }
    }

    pub fn position_of(&self, key_code: KeyCode) -> Option<PhysicalPosition> {
        self.positions.get(&key_code).copied()
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::qwerty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_and_w_are_adjacent_on_the_same_row() {
        let layout = KeyboardLayout::qwerty();
        let q = layout.position_of('Q' as KeyCode).unwrap();
        let w = layout.position_of('W' as KeyCode).unwrap();
        assert_eq!(q.row, w.row);
        assert_eq!(w.col, q.col + 1);
    }

    #[test]
    fn unmapped_key_returns_none() {
        let layout = KeyboardLayout::qwerty();
        assert!(layout.position_of(0x1001).is_none());
    }
}
