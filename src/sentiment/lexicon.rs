// src/sentiment/lexicon.rs
use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use super::SubScorer;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Built-in word-list scorer with short-range negation. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, token count). A negator within the previous
    /// three tokens flips the sign of a word's score.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for (i, w) in tokens.iter().enumerate() {
            let base = self.word_score(w);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Map a raw score onto `[0, 1]` with 0.5 as neutral.
    pub fn normalized(&self, text: &str) -> f64 {
        let (raw, _) = self.score_text(text);
        let raw = f64::from(raw);
        0.5 + 0.5 * raw / (raw.abs() + 4.0)
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot"
            | "without" | "don't" | "didn't"
    )
}

#[async_trait]
impl SubScorer for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn score_one(&self, text: &str) -> anyhow::Result<f64> {
        Ok(self.normalized(text))
    }
}
