// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// A bijection between musical Events and integer Tokens,
// built exactly once from the training corpus and frozen from
// then on. The first four ids are reserved:
//
//   0 [PAD]  padding inside fixed-size training windows
//   1 [UNK]  an event never seen during vocabulary construction
//   2 [BOS]  start of a piece
//   3 [EOS]  end of a piece
//
// Real events are numbered from 4 upward in first-seen order,
// so the mapping is deterministic given identical corpus
// ordering.
//
// Freezing matters: a checkpoint is only valid for the
// vocabulary it was trained with, so nothing here exposes a
// way to grow or reorder the table after construction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::event::Event;

pub const PAD: u32 = 0;
pub const UNK: u32 = 1;
pub const BOS: u32 = 2;
pub const EOS: u32 = 3;

/// Id of the first real event token.
pub const FIRST_EVENT: u32 = 4;

/// The frozen Event ↔ Token table.
///
/// Serialized as the bare event list — the reverse index is
/// rebuilt on deserialization, so the on-disk form stays a
/// plain JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Event>", into = "Vec<Event>")]
pub struct Vocabulary {
    events: Vec<Event>,
    index: HashMap<Event, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from events in first-seen order.
    pub fn build<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut vocab = Self { events: Vec::new(), index: HashMap::new() };
        for event in events {
            if !vocab.index.contains_key(event) {
                let id = FIRST_EVENT + vocab.events.len() as u32;
                vocab.index.insert(*event, id);
                vocab.events.push(*event);
            }
        }
        vocab
    }

    /// Total number of token ids, reserved specials included.
    /// This is the model's output dimension.
    pub fn len(&self) -> usize {
        FIRST_EVENT as usize + self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Encode one event. Events outside the frozen table map to
    /// [UNK] — the table is never grown at encode time.
    pub fn encode_event(&self, event: &Event) -> u32 {
        self.index.get(event).copied().unwrap_or(UNK)
    }

    /// Decode one token back to its event.
    ///
    /// Reserved specials and out-of-range ids have no inverse
    /// mapping and fail with a decode error — never silently
    /// skipped, since a special in decoded output means the
    /// vocabulary and the model disagree.
    pub fn decode_token(&self, token: u32) -> CoreResult<Event> {
        let idx = token.checked_sub(FIRST_EVENT).ok_or_else(|| {
            CoreError::Decode(format!("token {token} is a reserved id with no event mapping"))
        })?;
        self.events.get(idx as usize).copied().ok_or_else(|| {
            CoreError::Decode(format!(
                "token {token} is outside the vocabulary (size {})",
                self.len()
            ))
        })
    }

    /// Decode a whole token sequence, failing on the first token
    /// without an inverse mapping.
    pub fn decode(&self, tokens: &[u32]) -> CoreResult<Vec<Event>> {
        tokens.iter().map(|&t| self.decode_token(t)).collect()
    }
}

impl From<Vec<Event>> for Vocabulary {
    fn from(events: Vec<Event>) -> Self {
        let index = events
            .iter()
            .enumerate()
            .map(|(i, e)| (*e, FIRST_EVENT + i as u32))
            .collect();
        Self { events, index }
    }
}

impl From<Vocabulary> for Vec<Event> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.events
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn c4_quarter() -> Event {
        Event::new(60, 0, 2, 80)
    }
    fn e4_quarter() -> Event {
        Event::new(64, 2, 2, 80)
    }
    fn g4_half() -> Event {
        Event::new(67, 2, 4, 80)
    }

    #[test]
    fn test_three_note_scenario_round_trips() {
        // C4-quarter, E4-quarter, G4-half: three distinct,
        // non-unknown tokens that decode back in order.
        let corpus = [c4_quarter(), e4_quarter(), g4_half()];
        let vocab = Vocabulary::build(corpus.iter());

        let tokens: Vec<u32> = corpus.iter().map(|e| vocab.encode_event(e)).collect();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|&t| t != UNK));
        assert_eq!(tokens[0], FIRST_EVENT);
        assert_ne!(tokens[0], tokens[1]);
        assert_ne!(tokens[1], tokens[2]);

        assert_eq!(vocab.decode(&tokens).unwrap(), corpus.to_vec());
    }

    #[test]
    fn test_unseen_event_maps_to_unk() {
        let vocab = Vocabulary::build([c4_quarter()].iter());
        assert_eq!(vocab.encode_event(&g4_half()), UNK);
    }

    #[test]
    fn test_duplicate_events_share_one_token() {
        let vocab = Vocabulary::build([c4_quarter(), c4_quarter(), e4_quarter()].iter());
        assert_eq!(vocab.len(), FIRST_EVENT as usize + 2);
    }

    #[test]
    fn test_specials_have_no_inverse_mapping() {
        let vocab = Vocabulary::build([c4_quarter()].iter());
        for special in [PAD, UNK, BOS, EOS] {
            assert!(vocab.decode_token(special).is_err());
        }
        assert!(vocab.decode_token(999).is_err());
    }

    #[test]
    fn test_serde_round_trip_preserves_mapping() {
        let vocab = Vocabulary::build([c4_quarter(), e4_quarter(), g4_half()].iter());
        let json = serde_json::to_string(&vocab).unwrap();
        let restored: Vocabulary = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), vocab.len());
        for event in [c4_quarter(), e4_quarter(), g4_half()] {
            assert_eq!(restored.encode_event(&event), vocab.encode_event(&event));
        }
    }
}
