use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One fixed-size training window, already padded.
/// Layout: `window + 1` tokens; inputs are all but the last,
/// targets all but the first (shift-by-one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSample {
    pub tokens: Vec<u32>,
}

impl SequenceSample {
    pub fn new(tokens: Vec<u32>) -> Self {
        Self { tokens }
    }

    pub fn inputs(&self) -> &[u32] {
        &self.tokens[..self.tokens.len() - 1]
    }

    pub fn targets(&self) -> &[u32] {
        &self.tokens[1..]
    }
}

pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
