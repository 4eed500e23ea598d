//! MIDI note name formatting and parsing, used by logging/diagnostics and
//! by any future preset-editing surface that lets someone type "C#3"
//! instead of "61". Middle C is C4.

const NOTE_LETTERS: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// "C4" for 60, "C#3" for 49, clamped to the valid MIDI range.
pub fn midi_note_name(note_number: i32) -> String {
    let n = note_number.clamp(0, 127);
    let octave = n / 12 - 1;
    let letter = NOTE_LETTERS[(n % 12) as usize];
    format!("{letter}{octave}")
}

/// Parse "C#3", "Bb4", "A-1", or a bare integer back to a MIDI note number.
/// Falls back to 60 (middle C) on anything unparsable, matching the
/// original's lenient text-field behavior.
pub fn midi_note_from_text(text: &str) -> i32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 60;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '+') {
        return trimmed.parse::<i32>().unwrap_or(60).clamp(0, 127);
    }

    let upper = trimmed.to_uppercase();
    let mut chars = upper.char_indices();
    let Some((letter_pos, letter)) = chars.find(|(_, c)| ('A'..='G').contains(c)) else {
        return 60;
    };
    let mut note_index = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return 60,
    };

    let after_letter = &upper[letter_pos + letter.len_utf8()..];
    if after_letter.starts_with('#') {
        note_index += 1;
    } else if after_letter.starts_with('B') || after_letter.starts_with('♭') {
        note_index -= 1;
    }

    let octave_str: String = trimmed[letter_pos + letter.len_utf8()..]
        .chars()
        .skip_while(|c| !(c.is_ascii_digit() || *c == '-'))
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    let octave: i32 = octave_str.parse().unwrap_or(4);

    ((octave + 1) * 12 + note_index).clamp(0, 127)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_c4() {
        assert_eq!(midi_note_name(60), "C4");
    }

    #[test]
    fn sharps_and_octave_boundaries() {
        assert_eq!(midi_note_name(61), "C#4");
        assert_eq!(midi_note_name(0), "C-1");
        assert_eq!(midi_note_name(127), "G9");
    }

    #[test]
    fn parses_plain_integers() {
        assert_eq!(midi_note_from_text("60"), 60);
        assert_eq!(midi_note_from_text(""), 60);
    }

    #[test]
    fn parses_note_names_with_accidentals_and_negative_octaves() {
        assert_eq!(midi_note_from_text("C4"), 60);
        assert_eq!(midi_note_from_text("C#3"), 49);
        assert_eq!(midi_note_from_text("A-1"), 9);
    }

    #[test]
    fn round_trips_through_name_and_back() {
        for n in [0, 21, 60, 69, 108, 127] {
            let name = midi_note_name(n);
            assert_eq!(midi_note_from_text(&name), n);
        }
    }
}
