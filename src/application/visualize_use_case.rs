// ============================================================
// Layer 2 — Visualize Use Case
// ============================================================
// Thin piano-roll dump: one row per pitch in use, one column
// per time step, '█' where the note sounds. Enough to eyeball
// what the generator produced without opening a DAW.

use std::path::Path;

use anyhow::Result;

use crate::data::loader::load_midi_file;
use crate::domain::event::Event;
use crate::domain::piece::Piece;

/// Widest roll we print before truncating.
const MAX_COLUMNS: usize = 96;

pub struct VisualizeUseCase {
    input:          String,
    ticks_per_step: u32,
}

impl VisualizeUseCase {
    pub fn new(input: String, ticks_per_step: u32) -> Self {
        Self { input, ticks_per_step }
    }

    /// Render the piano roll as text lines.
    pub fn execute(&self) -> Result<Vec<String>> {
        let piece = load_midi_file(Path::new(&self.input), self.ticks_per_step)?;
        Ok(render_piano_roll(&piece))
    }
}

fn render_piano_roll(piece: &Piece) -> Vec<String> {
    if piece.events.is_empty() {
        return vec![format!("{}: no notes", piece.source)];
    }

    // Absolute onsets from the delta encoding
    let mut placed: Vec<(u32, &Event)> = Vec::with_capacity(piece.events.len());
    let mut onset = 0u32;
    for e in &piece.events {
        onset += e.delta;
        placed.push((onset, e));
    }

    let lo = piece.events.iter().map(|e| e.pitch).min().unwrap();
    let hi = piece.events.iter().map(|e| e.pitch).max().unwrap();
    let total = piece.length_steps() as usize;
    let columns = total.min(MAX_COLUMNS);

    let mut lines = Vec::with_capacity((hi - lo) as usize + 2);
    lines.push(format!(
        "{}: {} notes, {} steps{}",
        piece.source,
        piece.events.len(),
        total,
        if total > columns { format!(" (showing first {columns})") } else { String::new() },
    ));

    // High pitches on top, like every sequencer since forever
    for pitch in (lo..=hi).rev() {
        let mut row = vec![' '; columns];
        for &(start, e) in &placed {
            if e.pitch != pitch {
                continue;
            }
            let from = start as usize;
            let to = (start + e.duration) as usize;
            for cell in row.iter_mut().take(to.min(columns)).skip(from.min(columns)) {
                *cell = '█';
            }
        }
        let label = Event::new(pitch, 0, 1, 64).pitch_name();
        lines.push(format!("{label:>4} │{}", row.into_iter().collect::<String>()));
    }

    lines
}
