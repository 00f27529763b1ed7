// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns that don't belong to any
// one business layer:
//
//   checkpoint.rs  — Saving and loading model weights with
//                    Burn's CompactRecorder, plus the training
//                    config JSON that lets inference rebuild
//                    the exact architecture.
//
//   vocab_store.rs — Vocabulary persistence. The same frozen
//                    Event ↔ Token table must be used for
//                    training and generation; this is where it
//                    lives between runs.
//
//   metrics.rs     — Per-epoch training metrics appended to a
//                    CSV file for later analysis.
//
// Reference: Rust Book §7 (Modules), §9 (Error Handling)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary saving and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
