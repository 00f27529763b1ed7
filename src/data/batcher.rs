// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec of token
// windows into backend-ready tensors.
//
// Input:  N SequenceSamples, each `window + 1` tokens
// Output: inputs  [N, window] — every token but the last
//         targets [N, window] — every token but the first
//
// All windows are pre-padded to the same length, so batching
// is flatten-then-reshape with no dynamic padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::SequenceSample;

/// A batch of next-token training examples.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids fed to the model — shape: [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Ground-truth next tokens per position — shape: [batch_size, seq_len]
    pub targets: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        // All windows share one length (pre-padded)
        let seq_len = items[0].tokens.len() - 1;

        // Burn uses i32 for Int tensors
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.inputs().iter().map(|&t| t as i32))
            .collect();

        let target_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.targets().iter().map(|&t| t as i32))
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let targets = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        SequenceBatch { inputs, targets }
    }
}
