// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw .mid files all the
// way to backend-ready tensor batches.
//
// The pipeline flows in this order:
//
//   .mid files
//       │
//       ▼
//   MidiLoader        → parses files into note events
//       │
//       ▼
//   CorpusEncoder     → builds the vocabulary, encodes pieces
//       │               as token sequences
//       ▼
//   TokenWindows      → slides fixed-size windows over each
//       │               sequence
//       ▼
//   SequenceDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher   → stacks windows into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// The inverse direction (tokens → events → .mid) lives in
// `vocab` (decoding) and `writer` (MIDI output).
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Parses .mid files from a directory using midly
pub mod loader;

/// Writes generated events back out as a Standard MIDI File
pub mod writer;

/// The frozen Event ↔ Token vocabulary
pub mod vocab;

/// Builds the vocabulary and token sequences from a corpus
pub mod encoder;

/// Slides fixed-size training windows over token sequences
pub mod windows;

/// Implements Burn's Dataset trait for token windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
