// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their configurable
// flags. clap's derive macros generate help text, error
// messages and type conversion.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::bail;
use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ArchitectureKind;
use crate::ml::sampler::SamplingStrategy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a sequence model on a directory of .mid files
    Train(TrainArgs),

    /// Generate a new piece from a trained checkpoint
    Generate(GenerateArgs),

    /// Print an ASCII piano roll of a .mid file
    Visualize(VisualizeArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing .mid files to train on
    #[arg(long, default_value = "data/midi")]
    pub midi_dir: String,

    /// Directory to save checkpoints, config and vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Model architecture: 'attention' (transformer) or
    /// 'recurrent' (lstm)
    #[arg(long, default_value = "attention")]
    pub architecture: ArchitectureKind,

    /// MIDI ticks per quantization step (120 = 16th notes at
    /// the standard 480 ticks per quarter)
    #[arg(long, default_value_t = 120)]
    pub ticks_per_step: u32,

    /// Number of tokens the model sees per training example
    #[arg(long, default_value_t = 64)]
    pub context_window: usize,

    /// Tokens advanced between consecutive training windows
    #[arg(long, default_value_t = 32)]
    pub stride: usize,

    /// Number of windows processed together in one forward pass
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Emit a checkpoint every N epochs (the final epoch is
    /// always checkpointed)
    #[arg(long, default_value_t = 1)]
    pub checkpoint_every: usize,

    /// Learning rate — too high diverges, too low crawls
    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    /// Embedding width (d_model); every token becomes a vector
    /// of this size
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// Attention heads (attention architecture only);
    /// d_model must be divisible by this
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Stacked decoder layers (attention architecture only)
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    /// Feed-forward inner dimension, typically 4x d_model
    /// (attention architecture only)
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// LSTM hidden state size (recurrent architecture only)
    #[arg(long, default_value_t = 512)]
    pub hidden_size: usize,

    /// Dropout probability during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            midi_dir:         a.midi_dir,
            checkpoint_dir:   a.checkpoint_dir,
            architecture:     a.architecture,
            ticks_per_step:   a.ticks_per_step,
            context_window:   a.context_window,
            stride:           a.stride,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            checkpoint_every: a.checkpoint_every,
            lr:               a.lr,
            d_model:          a.d_model,
            num_heads:        a.num_heads,
            num_layers:       a.num_layers,
            d_ff:             a.d_ff,
            hidden_size:      a.hidden_size,
            dropout:          a.dropout,
            // Derived from the corpus when the vocabulary is built
            vocab_size:       0,
        }
    }
}

/// All arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Output .mid file path
    #[arg(long, default_value = "generated.mid")]
    pub output: String,

    /// Maximum number of tokens to generate (the piece may end
    /// earlier if the model produces its end token)
    #[arg(long, default_value_t = 256)]
    pub length: usize,

    /// Token selection: 'greedy', 'temperature' or 'top-k'
    #[arg(long, default_value = "greedy")]
    pub strategy: String,

    /// Softmax temperature for 'temperature' and 'top-k'
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    /// Candidate pool size for 'top-k'
    #[arg(long, default_value_t = 8)]
    pub top_k: usize,

    /// RNG seed — identical seeds reproduce identical output
    #[arg(long, default_value_t = 0)]
    pub rng_seed: u64,

    /// Optional .mid file whose events seed the generation
    #[arg(long)]
    pub seed_file: Option<String>,

    /// Tempo of the output file in beats per minute
    #[arg(long, default_value_t = 120)]
    pub tempo: u32,
}

impl TryFrom<GenerateArgs> for GenerateConfig {
    type Error = anyhow::Error;

    fn try_from(a: GenerateArgs) -> Result<Self, Self::Error> {
        let strategy = match a.strategy.as_str() {
            "greedy" => SamplingStrategy::Greedy,
            "temperature" => SamplingStrategy::Temperature { temperature: a.temperature },
            "top-k" | "topk" => SamplingStrategy::TopK { k: a.top_k, temperature: a.temperature },
            other => bail!("unknown strategy '{other}' (expected 'greedy', 'temperature' or 'top-k')"),
        };

        Ok(GenerateConfig {
            checkpoint_dir: a.checkpoint_dir,
            output:         a.output,
            length:         a.length,
            strategy,
            rng_seed:       a.rng_seed,
            seed_file:      a.seed_file,
            tempo_bpm:      a.tempo,
        })
    }
}

/// All arguments for the `visualize` command.
#[derive(Args, Debug)]
pub struct VisualizeArgs {
    /// The .mid file to render
    #[arg(long)]
    pub input: String,

    /// MIDI ticks per quantization step (match the training
    /// setting to see what the model saw)
    #[arg(long, default_value_t = 120)]
    pub ticks_per_step: u32,
}
