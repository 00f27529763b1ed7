// ============================================================
// Layer 2 — Generate Use Case
// ============================================================
// Turns a trained checkpoint into a new .mid file:
//
//   1. Load train_config.json and vocab.json
//   2. Fail fast if the checkpoint and vocabulary disagree —
//      weights are only meaningful for the exact token table
//      they were trained with
//   3. Optionally encode a seed file's events as the prefix
//   4. Rebuild the architecture, load weights, sample tokens
//   5. Decode tokens back to events and write the MIDI file

use std::path::Path;

use anyhow::{Context, Result};

use crate::data::loader::load_midi_file;
use crate::data::vocab::BOS;
use crate::data::writer::write_midi;
use crate::domain::errors::CoreError;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::sampler::{generate_from_checkpoint, SamplingStrategy};

pub struct GenerateConfig {
    pub checkpoint_dir: String,
    pub output:         String,
    /// Maximum number of new tokens (the piece may end earlier)
    pub length:         usize,
    pub strategy:       SamplingStrategy,
    pub rng_seed:       u64,
    /// Optional MIDI file whose events seed the generation
    pub seed_file:      Option<String>,
    pub tempo_bpm:      u32,
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Run one generation pass. Returns the number of events
    /// written to the output file.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        let train_cfg = ckpt_manager.load_config()?;
        let vocab = VocabStore::new(&cfg.checkpoint_dir).load()?;

        // The mismatch check comes before any model work
        if vocab.len() != train_cfg.vocab_size {
            return Err(CoreError::VocabularyMismatch {
                expected: train_cfg.vocab_size,
                found:    vocab.len(),
            }
            .into());
        }

        // Seed prefix: [BOS] alone, or [BOS] plus the seed
        // file's events. Events the vocabulary has never seen
        // encode to [UNK] — the table stays frozen.
        let seed_tokens: Vec<u32> = match &cfg.seed_file {
            Some(path) => {
                let piece = load_midi_file(Path::new(path), train_cfg.ticks_per_step)
                    .with_context(|| format!("Cannot load seed file '{path}'"))?;
                tracing::info!("Seeding from '{}' ({} events)", piece.source, piece.events.len());
                let mut tokens = vec![BOS];
                tokens.extend(piece.events.iter().map(|e| vocab.encode_event(e)));
                tokens
            }
            None => Vec::new(),
        };

        let generated = generate_from_checkpoint(
            &ckpt_manager,
            &train_cfg,
            cfg.strategy,
            cfg.rng_seed,
            &seed_tokens,
            cfg.length,
        )?;
        tracing::info!("Generated {} tokens", generated.len());

        // Every generated token must decode; a token without an
        // inverse mapping is a DecodeError, not a skip
        let events = vocab.decode(&generated)?;

        write_midi(&events, Path::new(&cfg.output), train_cfg.ticks_per_step, cfg.tempo_bpm)?;
        Ok(events.len())
    }
}
