//! Note names to frequencies: "A2", "C#3", "Eb4".

/// Parse a note name into a MIDI note number.
///
/// `<letter><accidental?><octave>`, where the accidental is `#` or `b` and
/// the octave may be negative. C4 is middle C (60). Out-of-range or
/// malformed names give `None`.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = if let Some(octave) = rest.strip_prefix('#') {
        (1, octave)
    } else if let Some(octave) = rest.strip_prefix('b') {
        (-1, octave)
    } else {
        (0, rest)
    };
    let octave: i32 = octave.parse().ok()?;

    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|&n| n <= 127)
}

/// Equal-tempered frequency of a MIDI note, A4 = 440 Hz.
pub fn midi_to_freq(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Frequency of a named note.
pub fn note_frequency(name: &str) -> Option<f64> {
    parse_note_name(name).map(midi_to_freq)
}
