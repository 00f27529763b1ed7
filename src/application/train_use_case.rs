// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load .mid files            (Layer 4 - data)
//   Step 2: Build / load vocabulary    (Layer 6 - infra)
//   Step 3: Encode pieces as tokens    (Layer 4 - data)
//   Step 4: Slide training windows     (Layer 4 - data)
//   Step 5: Split train/validation     (Layer 4 - data)
//   Step 6: Build datasets             (Layer 4 - data)
//   Step 7: Save config + vocabulary   (Layer 6 - infra)
//   Step 8: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::sync::atomic::AtomicBool;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{SequenceDataset, SequenceSample},
    encoder::CorpusEncoder,
    loader::MidiLoader,
    splitter::split_train_val,
    windows::TokenWindows,
};
use crate::domain::traits::PieceSource;
use crate::infra::{
    checkpoint::CheckpointManager, metrics::MetricsLogger, vocab_store::VocabStore,
};
use crate::ml::model::ArchitectureKind;
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Serialisable so it
// can be saved next to the weights and reloaded for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub midi_dir:         String,
    pub checkpoint_dir:   String,
    pub architecture:     ArchitectureKind,
    pub ticks_per_step:   u32,
    pub context_window:   usize,
    pub stride:           usize,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub checkpoint_every: usize,
    pub lr:               f64,
    pub d_model:          usize,
    pub num_heads:        usize,
    pub num_layers:       usize,
    pub d_ff:             usize,
    pub hidden_size:      usize,
    pub dropout:          f64,
    /// Derived from the corpus vocabulary, never configured —
    /// 0 until the vocabulary has been built.
    pub vocab_size:       usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            midi_dir:         "data/midi".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            architecture:     ArchitectureKind::Attention,
            ticks_per_step:   120,
            context_window:   64,
            stride:           32,
            batch_size:       8,
            epochs:           10,
            checkpoint_every: 1,
            lr:               2e-4,
            d_model:          256,
            num_heads:        8,
            num_layers:       4,
            d_ff:             1024,
            hidden_size:      512,
            dropout:          0.1,
            vocab_size:       0,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end. The stop
    /// flag is forwarded to the trainer, which polls it between
    /// batches.
    pub fn execute(&self, stop: &AtomicBool) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the MIDI corpus ──────────────────────────────────────
        tracing::info!("Loading MIDI files from '{}'", cfg.midi_dir);
        let loader = MidiLoader::new(&cfg.midi_dir, cfg.ticks_per_step);
        let pieces = loader.load_all()?;
        ensure!(
            !pieces.is_empty(),
            "no .mid files found in '{}'",
            cfg.midi_dir
        );

        // ── Step 2: Build or reload the frozen vocabulary ─────────────────────
        let vocab_store = VocabStore::new(&cfg.checkpoint_dir);
        let vocab = vocab_store.load_or_build(&pieces)?;

        // ── Step 3: Encode pieces as token sequences ──────────────────────────
        let sequences = CorpusEncoder::encode_pieces(&vocab, &pieces);
        tracing::info!("Encoded {} pieces", sequences.len());

        // ── Step 4: Slide fixed-size windows over each sequence ───────────────
        let windows = TokenWindows::new(cfg.context_window, cfg.stride);
        let samples: Vec<SequenceSample> = sequences
            .iter()
            .flat_map(|seq| windows.windows(seq))
            .map(SequenceSample::new)
            .collect();
        ensure!(
            !samples.is_empty(),
            "corpus produced no training windows — are the pieces empty?"
        );
        tracing::info!("Created {} training windows", samples.len());

        // ── Step 5: Train / validation split (90/10) ──────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, 0.9);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 6: Build Burn datasets ───────────────────────────────────────
        let train_dataset = SequenceDataset::new(train_samples);
        let val_dataset   = SequenceDataset::new(val_samples);

        // ── Step 7: Save config for generation ────────────────────────────────
        // vocab_size travels with the weights; generation checks
        // it against the vocabulary before doing any model work
        let mut cfg = cfg.clone();
        cfg.vocab_size = vocab.len();

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(&cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(&cfg, train_dataset, val_dataset, &ckpt_manager, &metrics, stop)?;

        Ok(())
    }
}
