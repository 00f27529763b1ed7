use std::fmt;
use std::str::FromStr;

use burn::{
    nn::{
        attention::{
            generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig,
        },
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig, Lstm, LstmConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// The closed set of supported architectures. Trainer and
/// Sampler never inspect this — they are generic over
/// [`SequenceModel`]; only the application layer dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitectureKind {
    Recurrent,
    Attention,
}

impl FromStr for ArchitectureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recurrent" | "lstm" => Ok(Self::Recurrent),
            "attention" | "transformer" => Ok(Self::Attention),
            other => Err(format!(
                "unknown architecture '{other}' (expected 'recurrent' or 'attention')"
            )),
        }
    }
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recurrent => write!(f, "recurrent"),
            Self::Attention => write!(f, "attention"),
        }
    }
}

/// The one capability both architectures expose: a token prefix
/// in, next-token logits at every position out. Everything
/// downstream (loss, validation, sampling) is written against
/// this trait.
pub trait SequenceModel<B: Backend> {
    /// tokens: [batch, seq_len] → logits: [batch, seq_len, vocab]
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3>;

    /// Longest prefix the model can attend to.
    fn context_window(&self) -> usize;
}

// ─── Attention variant ────────────────────────────────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct AttentionModelConfig {
    pub vocab_size:     usize,
    pub context_window: usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub dropout:        f64,
}

impl AttentionModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.context_window, self.d_model).init(device);
        let layers: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let vocab_head = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        AttentionModel {
            token_embedding, position_embedding, layers,
            final_norm, vocab_head, dropout,
            context_window: self.context_window,
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DecoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_attn(mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// Causal transformer decoder: every position may only attend
/// to itself and earlier positions, which is what makes the
/// per-position logits valid next-token predictions.
#[derive(Module, Debug)]
pub struct AttentionModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub vocab_head:         Linear<B>,
    pub dropout:            Dropout,
    pub context_window:     usize,
}

impl<B: Backend> SequenceModel<B> for AttentionModel<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();

        let tok_emb = self.token_embedding.forward(tokens);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mask = generate_autoregressive_mask::<B>(batch_size, seq_len, &tok_emb.device());

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        self.vocab_head.forward(x) // [batch, seq_len, vocab]
    }

    fn context_window(&self) -> usize {
        self.context_window
    }
}

// ─── Recurrent variant ────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct RecurrentModelConfig {
    pub vocab_size:     usize,
    pub context_window: usize,
    pub d_model:        usize,
    pub hidden_size:    usize,
    pub dropout:        f64,
}

impl RecurrentModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentModel<B> {
        let embedding  = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let lstm       = LstmConfig::new(self.d_model, self.hidden_size, true).init(device);
        let vocab_head = LinearConfig::new(self.hidden_size, self.vocab_size).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        RecurrentModel {
            embedding, lstm, vocab_head, dropout,
            context_window: self.context_window,
        }
    }
}

/// Embedding → LSTM → linear head. The LSTM state starts from
/// zero on every forward call: each training example and each
/// generation run sees a fresh hidden state, never one carried
/// over from a previous sequence.
#[derive(Module, Debug)]
pub struct RecurrentModel<B: Backend> {
    pub embedding:      Embedding<B>,
    pub lstm:           Lstm<B>,
    pub vocab_head:     Linear<B>,
    pub dropout:        Dropout,
    pub context_window: usize,
}

impl<B: Backend> SequenceModel<B> for RecurrentModel<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let embedded = self.dropout.forward(self.embedding.forward(tokens));
        // None = zeroed initial state (reset per example/run)
        let (hidden, _state) = self.lstm.forward(embedded, None);
        self.vocab_head.forward(hidden) // [batch, seq_len, vocab]
    }

    fn context_window(&self) -> usize {
        self.context_window
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_attention_forward_shape() {
        let device = Default::default();
        let model: AttentionModel<TestBackend> =
            AttentionModelConfig::new(12, 8, 8, 2, 1, 16, 0.0).init(&device);

        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([2, 4, 5, 6].as_slice(), &device)
            .unsqueeze::<2>();
        let logits = model.forward(tokens);
        assert_eq!(logits.dims(), [1, 4, 12]);
    }

    #[test]
    fn test_recurrent_forward_shape() {
        let device = Default::default();
        let model: RecurrentModel<TestBackend> =
            RecurrentModelConfig::new(12, 8, 8, 16, 0.0).init(&device);

        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([2, 4, 5, 6].as_slice(), &device)
            .unsqueeze::<2>();
        let logits = model.forward(tokens);
        assert_eq!(logits.dims(), [1, 4, 12]);
    }

    #[test]
    fn test_architecture_kind_parses_aliases() {
        assert_eq!("lstm".parse::<ArchitectureKind>().unwrap(), ArchitectureKind::Recurrent);
        assert_eq!("transformer".parse::<ArchitectureKind>().unwrap(), ArchitectureKind::Attention);
        assert!("mamba".parse::<ArchitectureKind>().is_err());
    }
}
