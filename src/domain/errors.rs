// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure in the core is one of three things: bad input
// data, a fatal numerical condition, or a checkpoint used with
// the wrong vocabulary. None of them is transient, so nothing
// here is ever retried.
//
// The application layer wraps these with anyhow::Context for
// user-facing messages; the core keeps them typed so callers
// can match on the failure class.
//
// Reference: Rust Book §9 (Error Handling)

use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input event data, or a token with no inverse
    /// mapping at decode time. Always surfaced to the caller.
    #[error("decode: {0}")]
    Decode(String),

    /// Training loss became non-finite. Fatal — divergence means
    /// the configuration is wrong, not that the run was unlucky.
    /// Carries the last finite loss for diagnostics.
    #[error("training diverged (last finite loss: {last_loss:.6})")]
    TrainingDiverged { last_loss: f64 },

    /// A checkpoint's vocabulary does not match the encoder in
    /// use. Detected before any generation work begins.
    #[error("vocabulary mismatch: checkpoint was trained with {expected} tokens, loaded vocabulary has {found}")]
    VocabularyMismatch { expected: usize, found: usize },
}
