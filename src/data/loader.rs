// ============================================================
// Layer 4 — MIDI Loader
// ============================================================
// Loads .mid files from a directory using the midly crate.
//
// A Standard MIDI File is a sequence of tracks, each a list of
// delta-timed events. We care only about NoteOn/NoteOff pairs:
// a NoteOn with velocity > 0 opens a note, the matching NoteOff
// (or NoteOn with velocity 0 — the running-status idiom) closes
// it. Everything else (controllers, pitch bend, meta events)
// is ignored.
//
// Timing: raw ticks are quantized to a step grid by dividing
// through `ticks_per_step` with round-to-nearest, so two
// near-identical performances produce identical events. Onsets
// become deltas from the previous event's onset, which is what
// the vocabulary tokenizes.
//
// A file that fails to parse fails the whole load — a corpus
// with a corrupt file in it is a caller problem, not something
// to paper over by skipping.
//
// Reference: midly crate documentation
//            Rust Book §9 (Error Handling)

use std::collections::HashMap;
use std::{fs, path::Path};

use anyhow::{Context, Result};
use midly::{MidiMessage, Smf, TrackEventKind};

use crate::domain::errors::CoreError;
use crate::domain::event::Event;
use crate::domain::piece::Piece;
use crate::domain::traits::PieceSource;

/// Loads all .mid/.midi files from a directory, sorted by
/// filename so the vocabulary build order is deterministic.
pub struct MidiLoader {
    dir: String,
    ticks_per_step: u32,
}

impl MidiLoader {
    pub fn new(dir: impl Into<String>, ticks_per_step: u32) -> Self {
        Self { dir: dir.into(), ticks_per_step }
    }
}

impl PieceSource for MidiLoader {
    fn load_all(&self) -> Result<Vec<Piece>> {
        let dir = Path::new(&self.dir);

        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Cannot read MIDI directory '{}'", self.dir))?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                matches!(ext.as_deref(), Some("mid" | "midi"))
            })
            .collect();
        paths.sort();

        let mut pieces = Vec::with_capacity(paths.len());
        for path in &paths {
            let piece = load_midi_file(path, self.ticks_per_step)?;
            tracing::debug!("Loaded: {} ({} events)", piece.source, piece.events.len());
            pieces.push(piece);
        }

        tracing::info!("Loaded {} pieces from '{}'", pieces.len(), self.dir);
        Ok(pieces)
    }
}

/// Parse a single MIDI file into a Piece.
///
/// Also used directly by the generate and visualize commands
/// for seed files and piano-roll dumps.
pub fn load_midi_file(path: &Path, ticks_per_step: u32) -> Result<Piece> {
    let bytes = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;

    let smf = Smf::parse(&bytes).map_err(|e| {
        CoreError::Decode(format!("'{}' is not a valid MIDI file: {e}", path.display()))
    })?;

    // (onset_tick, pitch, duration_ticks, velocity), merged across tracks
    let mut notes: Vec<(u32, u8, u32, u8)> = Vec::new();

    for track in &smf.tracks {
        let mut tick = 0u32;
        // pitch → (onset tick, velocity) for notes currently sounding
        let mut open: HashMap<u8, (u32, u8)> = HashMap::new();

        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.insert(key.as_int(), (tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        if let Some((onset, vel)) = open.remove(&key.as_int()) {
                            notes.push((onset, key.as_int(), tick.saturating_sub(onset), vel));
                        }
                    }
                    _ => {}
                }
            }
        }

        // Close anything left sounding at the end of the track
        for (pitch, (onset, vel)) in open {
            notes.push((onset, pitch, tick.saturating_sub(onset), vel));
        }
    }

    notes.sort_by_key(|&(onset, pitch, dur, vel)| (onset, pitch, dur, vel));

    // Quantize ticks to steps and convert onsets to deltas
    let mut events = Vec::with_capacity(notes.len());
    let mut prev_onset = 0u32;
    for (onset, pitch, dur, vel) in notes {
        let onset_step = round_div(onset, ticks_per_step);
        let dur_step = round_div(dur, ticks_per_step).max(1);
        events.push(Event::new(pitch, onset_step - prev_onset, dur_step, vel));
        prev_onset = onset_step;
    }

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(Piece::new(source, events))
}

/// Integer division with round-to-nearest.
fn round_div(x: u32, q: u32) -> u32 {
    (x + q / 2) / q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_div_rounds_to_nearest() {
        assert_eq!(round_div(0, 120), 0);
        assert_eq!(round_div(59, 120), 0);
        assert_eq!(round_div(60, 120), 1);
        assert_eq!(round_div(240, 120), 2);
        assert_eq!(round_div(250, 120), 2);
    }

    #[test]
    fn test_unparseable_file_is_a_decode_error() {
        let dir = std::env::temp_dir().join(format!("cadenza-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.mid");
        fs::write(&path, b"definitely not midi").unwrap();

        let err = load_midi_file(&path, 120).unwrap_err();
        assert!(err.downcast_ref::<CoreError>().is_some());

        fs::remove_dir_all(&dir).ok();
    }
}
