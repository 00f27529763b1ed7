// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code
// that uses them:
//   - MidiLoader implements PieceSource
//   - A future MusicXmlLoader could also implement PieceSource
//   - The application layer only sees PieceSource
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::piece::Piece;

/// Any component that can load pieces from a source.
pub trait PieceSource {
    /// Load all available pieces from this source, in a
    /// deterministic order. Returns an error if any file cannot
    /// be parsed into events — a malformed corpus is never
    /// silently truncated.
    fn load_all(&self) -> Result<Vec<Piece>>;
}
