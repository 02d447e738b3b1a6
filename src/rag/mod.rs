// src/rag/mod.rs
//! Retrieval-augmented answers over the current cycle's items.
//!
//! A session is built per request: `index` chunks the documents, `build_chain`
//! binds the LLM, `answer` retrieves the best chunks and asks the LLM.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{SentinelError, SentinelResult};
use crate::llm::{DynLlm, ANALYST_SYSTEM_PROMPT};

pub const CHUNK_SIZE: usize = 800;
pub const CHUNK_OVERLAP: usize = 160;
pub const TOP_K: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub result: String,
    pub sources: Vec<Document>,
}

#[async_trait]
pub trait RagSession: Send + Sync {
    /// `false` when nothing indexable was given.
    fn index(&mut self, docs: Vec<Document>) -> bool;
    /// `false` without an index or a configured LLM.
    fn build_chain(&mut self, temperature: f32) -> bool;
    async fn answer(&self, query: &str) -> SentinelResult<RagAnswer>;
}

pub trait RagBackend: Send + Sync {
    fn session(&self) -> Box<dyn RagSession>;
}

/// Keyword-overlap retriever with the LLM as the answering step.
pub struct KeywordRag {
    llm: DynLlm,
}

impl KeywordRag {
    pub fn new(llm: DynLlm) -> Self {
        Self { llm }
    }
}

impl RagBackend for KeywordRag {
    fn session(&self) -> Box<dyn RagSession> {
        Box::new(KeywordSession {
            llm: self.llm.clone(),
            chunks: Vec::new(),
            temperature: None,
        })
    }
}

struct Chunk {
    doc: Document,
    terms: HashSet<String>,
}

struct KeywordSession {
    llm: DynLlm,
    chunks: Vec<Chunk>,
    temperature: Option<f32>,
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Splits on char boundaries into windows of `size` chars that overlap by
/// `overlap` chars.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}

impl KeywordSession {
    /// Up to [`TOP_K`] chunks by distinct query-term overlap, ties in index
    /// order. No overlap at all returns the first chunks.
    fn retrieve(&self, query: &str) -> Vec<&Chunk> {
        let q = terms(query);
        let mut ranked: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.terms.intersection(&q).count()))
            .filter(|(_, hits)| *hits > 0)
            .collect();
        if ranked.is_empty() {
            return self.chunks.iter().take(TOP_K).collect();
        }
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(TOP_K)
            .map(|(i, _)| &self.chunks[i])
            .collect()
    }
}

#[async_trait]
impl RagSession for KeywordSession {
    fn index(&mut self, docs: Vec<Document>) -> bool {
        self.chunks = docs
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .flat_map(|d| {
                chunk_text(&d.text, CHUNK_SIZE, CHUNK_OVERLAP)
                    .into_iter()
                    .map(move |text| Chunk {
                        terms: terms(&text),
                        doc: Document {
                            text,
                            metadata: d.metadata.clone(),
                        },
                    })
            })
            .collect();
        tracing::debug!(chunks = self.chunks.len(), "rag index built");
        !self.chunks.is_empty()
    }

    fn build_chain(&mut self, temperature: f32) -> bool {
        if self.chunks.is_empty() || !self.llm.is_configured() {
            return false;
        }
        self.temperature = Some(temperature);
        true
    }

    async fn answer(&self, query: &str) -> SentinelResult<RagAnswer> {
        let temperature = self
            .temperature
            .ok_or_else(|| SentinelError::downstream("rag chain not built"))?;

        let hits = self.retrieve(query);
        let context: Vec<&str> = hits.iter().map(|c| c.doc.text.as_str()).collect();
        let prompt = format!(
            "Answer the question using only the context below.\n\nContext:\n{}\n\nQuestion: {query}",
            context.join("\n---\n")
        );
        let result = self
            .llm
            .complete(ANALYST_SYSTEM_PROMPT, &prompt, temperature)
            .await
            .map_err(|e| SentinelError::downstream(format!("{e:#}")))?;

        Ok(RagAnswer {
            result,
            sources: hits.into_iter().map(|c| c.doc.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::CannedLlm;
    use crate::llm::DisabledLlm;
    use std::sync::Arc;

    #[test]
    fn chunks_overlap_and_cover_text() {
        let text: String = "abcdefghij".repeat(200); // 2000 chars
        let chunks = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 800);
        assert_eq!(chunks[0][640..], chunks[1][..160]);
        assert!(text.ends_with(chunks[2].as_str()));
        assert!(chunk_text("", 800, 160).is_empty());
        assert_eq!(chunk_text("short", 800, 160), vec!["short".to_string()]);
    }

    #[test]
    fn chunking_respects_char_boundaries() {
        let text = "ü".repeat(1000);
        let chunks = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'ü')));
    }

    #[tokio::test]
    async fn answers_from_best_matching_chunks() {
        let rag = KeywordRag::new(Arc::new(CannedLlm("AAPL looks strong.")));
        let mut s = rag.session();
        assert!(s.index(vec![
            Document::new("tesla deliveries missed").with_meta("source", "news"),
            Document::new("apple earnings beat, apple guidance raised").with_meta("source", "reddit"),
            Document::new("   "),
        ]));
        assert!(s.build_chain(0.0));

        let ans = s.answer("how were apple earnings?").await.expect("answer");
        assert_eq!(ans.result, "AAPL looks strong.");
        assert_eq!(ans.sources.len(), 1);
        assert_eq!(ans.sources[0].metadata["source"], "reddit");
    }

    #[tokio::test]
    async fn unbuilt_or_unconfigured_chain_fails_soft() {
        let rag = KeywordRag::new(Arc::new(DisabledLlm));
        let mut s = rag.session();
        assert!(!s.index(vec![]));
        assert!(!s.build_chain(0.0));
        assert!(s.index(vec![Document::new("anything")]));
        assert!(!s.build_chain(0.0));
        assert!(matches!(
            s.answer("q").await,
            Err(SentinelError::DownstreamUnavailable(_))
        ));
    }
}
