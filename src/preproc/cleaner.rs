// src/preproc/cleaner.rs
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::{CleanedItem, RawItem};

pub const FILTERED_TOKEN: &str = "[filtered]";
pub const EMAIL_TOKEN: &str = "[anon_email]";
pub const IP_TOKEN: &str = "[anon_ip]";

/// Case-insensitive whole-word blocklist.
pub const BLOCKED_WORDS: &[&str] = &[
    "fuck", "shit", "nigger", "fag", "cunt", "bitch", "retard", "nigga", "faggot",
];

static RE_BLOCKED: Lazy<Regex> = Lazy::new(|| {
    let alternation = BLOCKED_WORDS
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("blocklist regex")
});
static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-]+\.[a-zA-Z0-9.\-]+").expect("email regex"));
static RE_IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ipv4 regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Redact one string. Pass order: blocklist, email, IPv4, whitespace.
pub fn clean_text(s: &str) -> String {
    let out = RE_BLOCKED.replace_all(s, FILTERED_TOKEN);
    let out = RE_EMAIL.replace_all(&out, EMAIL_TOKEN);
    let out = RE_IPV4.replace_all(&out, IP_TOKEN);
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Total over its input: same length, same order, only `text` changes.
pub fn clean(items: Vec<RawItem>) -> Vec<CleanedItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.text = clean_text(&item.text);
            CleanedItem::from_cleaned(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceKind;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn raw(text: &str) -> RawItem {
        RawItem::new(SourceKind::Forum, "test", text)
    }

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(clean_text("  hello  "), "hello");
        assert_eq!(clean_text("a\t\n  b"), "a b");
    }

    #[test]
    fn redacts_words_emails_and_ips() {
        let out = clean_text("SHIT mail me at bob.smith+x@corp.example.com from 10.0.0.12");
        assert_eq!(out, "[filtered] mail me at [anon_email] from [anon_ip]");
    }

    #[test]
    fn blocklist_matches_whole_words_only() {
        assert_eq!(clean_text("shitake mushrooms"), "shitake mushrooms");
        assert_eq!(clean_text("Bitch!"), "[filtered]!");
    }

    #[test]
    fn empty_text_stays_empty() {
        let out = clean(vec![raw(""), raw("   ")]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|i| i.text.is_empty()));
    }

    #[test]
    fn randomized_inputs_keep_length_order_and_invariants() {
        const POOL: &[&str] = &[
            "AAPL", "moon", "FuCk", "shit", "retard", "jane@doe.io", "192.168.1.1",
            "buy", "\t", "  ", "\n", "RELIANCE.NS", "1.2.3", "calls", "Cunt",
        ];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let n = rng.random_range(0..8);
            let items: Vec<RawItem> = (0..n)
                .map(|i| {
                    let words = rng.random_range(0..12);
                    let mut text = format!("#{i} ");
                    for _ in 0..words {
                        text.push_str(POOL[rng.random_range(0..POOL.len())]);
                        text.push(' ');
                    }
                    raw(&text)
                })
                .collect();

            let out = clean(items.clone());
            assert_eq!(out.len(), items.len());
            for (i, item) in out.iter().enumerate() {
                assert!(item.text.starts_with(&format!("#{i}")));
                assert!(!RE_BLOCKED.is_match(&item.text), "{}", item.text);
                assert!(!RE_EMAIL.is_match(&item.text), "{}", item.text);
                assert!(!RE_IPV4.is_match(&item.text), "{}", item.text);
                assert!(!item.text.contains("  "));
                assert_eq!(item.text, item.text.trim());
            }
        }
    }
}
