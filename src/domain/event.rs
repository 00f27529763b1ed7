// ============================================================
// Layer 3 — Event Domain Type
// ============================================================
// The atomic unit of symbolic music in this system: one note
// with its timing and loudness. Immutable once parsed.
//
// Time is measured in quantized steps (the loader divides raw
// MIDI ticks by a configurable grid), so two performances of
// the same score produce the same events.
//
// Eq + Hash over all four fields is what makes the vocabulary
// a true bijection: two events are the same token if and only
// if every field matches.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// One musical note event.
///
/// `delta` is the onset offset from the PREVIOUS event in steps
/// (0 for simultaneous onsets, i.e. chords), `duration` is how
/// long the note sounds, also in steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// MIDI key number, 0–127 (60 = middle C)
    pub pitch: u8,

    /// Steps since the previous event's onset
    pub delta: u32,

    /// Note length in steps (always at least 1)
    pub duration: u32,

    /// MIDI velocity, 1–127
    pub velocity: u8,
}

impl Event {
    pub fn new(pitch: u8, delta: u32, duration: u32, velocity: u8) -> Self {
        Self { pitch, delta, duration, velocity }
    }

    /// Human-readable pitch name, e.g. 60 → "C4".
    /// Octave numbering follows the MIDI convention (C4 = 60).
    pub fn pitch_name(&self) -> String {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let octave = (self.pitch as i32 / 12) - 1;
        format!("{}{}", NAMES[(self.pitch % 12) as usize], octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_names() {
        assert_eq!(Event::new(60, 0, 1, 80).pitch_name(), "C4");
        assert_eq!(Event::new(69, 0, 1, 80).pitch_name(), "A4");
        assert_eq!(Event::new(61, 0, 1, 80).pitch_name(), "C#4");
    }

    #[test]
    fn test_equality_covers_all_fields() {
        let a = Event::new(60, 0, 4, 80);
        assert_eq!(a, Event::new(60, 0, 4, 80));
        assert_ne!(a, Event::new(60, 0, 4, 81));
        assert_ne!(a, Event::new(60, 1, 4, 80));
    }
}
