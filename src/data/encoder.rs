// ============================================================
// Layer 4 — Corpus Encoder
// ============================================================
// Turns parsed pieces into token sequences. Two steps:
//
//   1. Build the vocabulary over every event in the corpus
//      (first-seen order — deterministic given identical input
//      ordering, which MidiLoader guarantees by sorting files).
//   2. Encode each piece as [BOS] events... [EOS] so the model
//      learns where pieces begin and end.
//
// No side effects beyond the returned structures — persistence
// of the vocabulary is infra's job (`infra::vocab_store`).

use crate::data::vocab::{Vocabulary, BOS, EOS};
use crate::domain::piece::Piece;

pub struct CorpusEncoder;

impl CorpusEncoder {
    /// Build the frozen vocabulary over all events in the corpus.
    pub fn build_vocabulary(pieces: &[Piece]) -> Vocabulary {
        Vocabulary::build(pieces.iter().flat_map(|p| p.events.iter()))
    }

    /// Encode every piece as one token sequence, bracketed with
    /// [BOS]/[EOS]. Events missing from the vocabulary encode to
    /// [UNK] — the table is frozen.
    pub fn encode_pieces(vocab: &Vocabulary, pieces: &[Piece]) -> Vec<Vec<u32>> {
        pieces
            .iter()
            .map(|piece| {
                let mut tokens = Vec::with_capacity(piece.events.len() + 2);
                tokens.push(BOS);
                tokens.extend(piece.events.iter().map(|e| vocab.encode_event(e)));
                tokens.push(EOS);
                tokens
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::UNK;
    use crate::domain::event::Event;

    fn corpus() -> Vec<Piece> {
        vec![
            Piece::new(
                "a.mid",
                vec![Event::new(60, 0, 2, 80), Event::new(64, 2, 2, 80)],
            ),
            Piece::new("b.mid", vec![Event::new(67, 0, 4, 80)]),
        ]
    }

    #[test]
    fn test_sequences_are_bracketed() {
        let pieces = corpus();
        let vocab = CorpusEncoder::build_vocabulary(&pieces);
        let seqs = CorpusEncoder::encode_pieces(&vocab, &pieces);

        assert_eq!(seqs.len(), 2);
        for seq in &seqs {
            assert_eq!(seq[0], BOS);
            assert_eq!(*seq.last().unwrap(), EOS);
        }
        // No corpus event should fall back to [UNK]
        assert!(seqs.iter().flatten().all(|&t| t != UNK));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let pieces = corpus();
        let v1 = CorpusEncoder::build_vocabulary(&pieces);
        let v2 = CorpusEncoder::build_vocabulary(&pieces);
        assert_eq!(
            CorpusEncoder::encode_pieces(&v1, &pieces),
            CorpusEncoder::encode_pieces(&v2, &pieces)
        );
    }
}
