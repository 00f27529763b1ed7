// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly, except the two
// infra files that persist model records and the data batcher.
//
// What's in this layer:
//
//   model.rs   — The SequenceModel capability trait and its
//                two architectures:
//                • AttentionModel — causal transformer decoder
//                  (token + positional embeddings, masked
//                  multi-head self-attention, GELU FFN,
//                  post-norm residuals)
//                • RecurrentModel — embedding → LSTM → head,
//                  hidden state reset on every forward
//
//   trainer.rs — The training loop: forward, cross-entropy
//                over every position, backward, Adam step,
//                validation, divergence detection, checkpoint
//                cadence, stop-flag polling
//
//   sampler.rs — The autoregressive generation loop with
//                greedy / temperature / top-k selection
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need
//            Hochreiter & Schmidhuber (1997) LSTM

/// The capability trait and both model architectures
pub mod model;

/// Training loop with validation, metrics and checkpointing
pub mod trainer;

/// Autoregressive token generation from a trained model
pub mod sampler;
