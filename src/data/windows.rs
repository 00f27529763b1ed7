// ============================================================
// Layer 4 — Token Windows
// ============================================================
// Slides fixed-size windows over a token sequence to produce
// training examples.
//
// The model predicts the next token at every position, so each
// window is `window + 1` tokens long: positions 0..window are
// the inputs, positions 1..=window the shifted targets. Windows
// advance by `stride` tokens; a stride below the window length
// gives overlapping examples, which is how one long piece
// becomes many.
//
// Example with window=4, stride=2 over "a b c d e f g":
//   Window 1:  a b c d e
//   Window 2:  c d e f g
//   Window 3:  e f g [PAD] [PAD]
//
// Tail windows are padded with [PAD]; the trainer masks [PAD]
// out of the loss so padding never contributes gradient.

use crate::data::vocab::PAD;

pub struct TokenWindows {
    /// Number of input positions per training example
    window: usize,
    /// Tokens advanced between consecutive windows
    stride: usize,
}

impl TokenWindows {
    /// # Panics
    /// Panics if `window < 2` (nothing to predict) or if
    /// `stride` is 0 or larger than `window` (infinite loop or
    /// skipped tokens).
    pub fn new(window: usize, stride: usize) -> Self {
        assert!(window >= 2, "window ({window}) must be at least 2");
        assert!(
            stride >= 1 && stride <= window,
            "stride ({stride}) must be in 1..={window}"
        );
        Self { window, stride }
    }

    /// Split a token sequence into padded windows of length
    /// `window + 1`. Sequences shorter than 2 tokens produce
    /// nothing — there is no next token to learn from.
    pub fn windows(&self, tokens: &[u32]) -> Vec<Vec<u32>> {
        if tokens.len() < 2 {
            return Vec::new();
        }

        let span = self.window + 1;
        let mut out = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + span).min(tokens.len());
            let mut w = tokens[start..end].to_vec();
            w.resize(span, PAD);
            out.push(w);

            if end == tokens.len() {
                break;
            }
            start += self.stride;
        }

        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_windowing() {
        let w = TokenWindows::new(4, 2);
        let tokens: Vec<u32> = (10..17).collect(); // 7 tokens
        let windows = w.windows(&tokens);

        assert_eq!(windows[0], vec![10, 11, 12, 13, 14]);
        assert_eq!(windows[1], vec![12, 13, 14, 15, 16]);
        assert!(windows.iter().all(|w| w.len() == 5));
    }

    #[test]
    fn test_tail_window_is_padded() {
        let w = TokenWindows::new(4, 4);
        let tokens: Vec<u32> = (10..17).collect();
        let windows = w.windows(&tokens);

        let last = windows.last().unwrap();
        assert_eq!(last.len(), 5);
        assert_eq!(last[last.len() - 2..], [PAD, PAD]);
    }

    #[test]
    fn test_short_sequence_gives_one_padded_window() {
        let w = TokenWindows::new(8, 4);
        let windows = w.windows(&[10, 11, 12]);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 9);
        assert_eq!(windows[0][..3], [10, 11, 12]);
        assert_eq!(windows[0][3], PAD);
    }

    #[test]
    fn test_too_short_sequence_gives_no_windows() {
        let w = TokenWindows::new(4, 2);
        assert!(w.windows(&[]).is_empty());
        assert!(w.windows(&[10]).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_stride_must_not_exceed_window() {
        let _ = TokenWindows::new(4, 5);
    }
}
