// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the frozen Event ↔ Token table next to the model
// weights. A checkpoint is only meaningful together with the
// vocabulary it was trained against, so both live in the same
// directory and travel together.
//
// On-disk format is a plain JSON array of events — the reverse
// index is rebuilt on load (see data::vocab).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::encoder::CorpusEncoder;
use crate::data::vocab::Vocabulary;
use crate::domain::piece::Piece;

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Load an existing vocabulary, or build one from the corpus
    /// and save it. Reusing a saved table keeps token ids stable
    /// across re-training runs in the same checkpoint directory.
    pub fn load_or_build(&self, pieces: &[Piece]) -> Result<Vocabulary> {
        let path = self.dir.join("vocab.json");
        if path.exists() {
            tracing::info!("Loading existing vocabulary from disk");
            self.load()
        } else {
            let vocab = CorpusEncoder::build_vocabulary(pieces);
            tracing::info!("Built new vocabulary ({} tokens)", vocab.len());
            self.save(&vocab)?;
            Ok(vocab)
        }
    }

    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.dir.join("vocab.json");
        let json = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read vocabulary from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        std::fs::create_dir_all(&self.dir).ok();
        let path = self.dir.join("vocab.json");
        std::fs::write(&path, serde_json::to_string_pretty(vocab)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;
        tracing::debug!("Saved vocabulary to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Event;

    #[test]
    fn test_save_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("cadenza-vocab-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = VocabStore::new(dir.to_string_lossy().into_owned());

        let events = vec![Event::new(60, 0, 2, 80), Event::new(64, 2, 2, 80)];
        let vocab = Vocabulary::build(events.iter());
        store.save(&vocab).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), vocab.len());
        for e in &events {
            assert_eq!(loaded.encode_event(e), vocab.encode_event(e));
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_or_build_prefers_the_saved_table() {
        let dir = std::env::temp_dir().join(format!("cadenza-vocab-lob-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = VocabStore::new(dir.to_string_lossy().into_owned());

        let first = vec![Piece::new("a.mid", vec![Event::new(60, 0, 2, 80)])];
        let built = store.load_or_build(&first).unwrap();

        // A second corpus must NOT grow the frozen table
        let second = vec![Piece::new("b.mid", vec![Event::new(72, 0, 1, 90)])];
        let reloaded = store.load_or_build(&second).unwrap();
        assert_eq!(reloaded.len(), built.len());

        std::fs::remove_dir_all(&dir).ok();
    }
}
