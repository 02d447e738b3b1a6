// src/preproc/dedupe.rs
use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::ingest::types::CleanedItem;

/// 128-bit content hash: the first 16 bytes of SHA-256 over the text.
pub fn content_hash(text: &str) -> u128 {
    let digest = Sha256::digest(text.as_bytes());
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(buf)
}

/// Keep the first item per distinct content hash, in input order.
/// Collisions count as duplicates.
pub fn dedupe(items: Vec<CleanedItem>) -> Vec<CleanedItem> {
    let mut seen: HashSet<u128> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(content_hash(&item.text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{RawItem, SourceKind};
    use crate::preproc::clean;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn cleaned(texts: &[&str]) -> Vec<CleanedItem> {
        clean(
            texts
                .iter()
                .map(|t| RawItem::new(SourceKind::News, "test", *t))
                .collect(),
        )
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let out = dedupe(cleaned(&["a", "b", "a", "c", "b"]));
        let texts: Vec<&str> = out.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_texts_collapse_to_one() {
        let out = dedupe(cleaned(&["", "  ", "x", ""]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "");
    }

    #[test]
    fn first_item_wins_even_across_sources() {
        let mut items = cleaned(&["same"]);
        items.extend(clean(vec![RawItem::new(SourceKind::Chat, "slack", "same")]));
        let out = dedupe(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, SourceKind::News);
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(content_hash("AAPL"), content_hash("AAPL"));
        assert_ne!(content_hash("AAPL"), content_hash("aapl"));
    }

    #[test]
    fn dedupe_is_idempotent_on_random_input() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let n = rng.random_range(0..30);
            let texts: Vec<String> = (0..n).map(|_| format!("t{}", rng.random_range(0..6))).collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let once = dedupe(cleaned(&refs));
            let twice = dedupe(once.clone());
            assert_eq!(once, twice);
        }
    }
}
