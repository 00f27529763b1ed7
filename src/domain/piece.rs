// ============================================================
// Layer 3 — Piece Domain Type
// ============================================================
// Represents a single piece of music loaded from disk.
// This is a plain data struct with no behaviour — a source
// name for traceability and the ordered events parsed out of
// the file. By the time a Piece exists, all MIDI container
// details have been dealt with.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

use crate::domain::event::Event;

/// A parsed piece of symbolic music.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    /// The filename — kept so diagnostics can point at the
    /// offending file
    pub source: String,

    /// All note events in onset order
    pub events: Vec<Event>,
}

impl Piece {
    pub fn new(source: impl Into<String>, events: Vec<Event>) -> Self {
        Self { source: source.into(), events }
    }

    /// Total length of the piece in steps (last onset + its duration).
    pub fn length_steps(&self) -> u32 {
        let mut onset = 0u32;
        let mut end = 0u32;
        for e in &self.events {
            onset += e.delta;
            end = end.max(onset + e.duration);
        }
        end
    }
}
