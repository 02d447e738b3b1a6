// src/signals.rs
//! Per-ticker aggregation of scored items into directional signals.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sentiment::ScoredItem;

pub const BULLISH_ABOVE: f64 = 0.6;
pub const BEARISH_BELOW: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalType {
    pub fn classify(score: f64) -> Self {
        if score > BULLISH_ABOVE {
            Self::Bullish
        } else if score < BEARISH_BELOW {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    pub fn action(self) -> Action {
        match self {
            Self::Bullish => Action::Buy,
            Self::Bearish => Action::Short,
            Self::Neutral => Action::Hold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Short,
    Hold,
}

/// One aggregation pass's judgment for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub ticker: String,
    #[serde(rename = "type")]
    pub kind: SignalType,
    pub score: f64,
    pub confidence: f64,
    pub action: Action,
    pub timestamp: String,
    #[serde(rename = "evidenceCount")]
    pub evidence_count: usize,
}

/// Source of the two non-deterministic signal fields.
pub trait Stamper: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn new_id(&self) -> Uuid;
}

/// Wall clock + random v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamper;

impl Stamper for SystemStamper {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Case-insensitive whole-word matcher on the ticker's base symbol
/// (`RELIANCE.NS` matches `reliance`). `None` when the base is empty.
fn ticker_matcher(ticker: &str) -> Option<Regex> {
    let base = ticker.split('.').next().unwrap_or_default().trim();
    if base.is_empty() {
        return None;
    }
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(base))) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(ticker, error = %e, "unmatchable ticker symbol");
            None
        }
    }
}

/// Compiled matchers for one ticker set. Build once per pass and reuse
/// across items; a ticker with an unusable symbol never matches.
pub struct TickerMatchers(Vec<(String, Option<Regex>)>);

impl TickerMatchers {
    pub fn new(tickers: &[String]) -> Self {
        Self(tickers.iter().map(|t| (t.clone(), ticker_matcher(t))).collect())
    }

    /// Tickers whose base symbol appears in `text`, in ticker order.
    pub fn mentions(&self, text: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, re)| re.as_ref().is_some_and(|re| re.is_match(text)))
            .map(|(t, _)| t.clone())
            .collect()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, Option<&Regex>)> {
        self.0.iter().map(|(t, re)| (t, re.as_ref()))
    }
}

/// One signal per ticker, in ticker order, stamped by the system clock.
pub fn aggregate(items: &[ScoredItem], tickers: &[String]) -> Vec<Signal> {
    aggregate_with(items, tickers, &SystemStamper)
}

/// Same as [`aggregate`] with an injectable clock and id source.
/// All signals of one pass share one timestamp.
pub fn aggregate_with(items: &[ScoredItem], tickers: &[String], stamper: &dyn Stamper) -> Vec<Signal> {
    let timestamp = stamper
        .now()
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    TickerMatchers::new(tickers)
        .iter()
        .map(|(ticker, matcher)| {
            let (sum, count) = match matcher {
                Some(re) => items
                    .iter()
                    .filter(|it| re.is_match(it.text()))
                    .fold((0.0, 0usize), |(s, n), it| (s + it.sentiment, n + 1)),
                None => (0.0, 0),
            };

            let score = sum / count.max(1) as f64;
            // Zero evidence: score 0, neutral, no conviction.
            let (kind, confidence) = if count == 0 {
                (SignalType::Neutral, 0.0)
            } else {
                (
                    SignalType::classify(score),
                    ((score - 0.5).abs() * 2.0).clamp(0.0, 1.0),
                )
            };

            Signal {
                id: stamper.new_id(),
                ticker: ticker.clone(),
                kind,
                score: round2(score),
                confidence: round2(confidence),
                action: kind.action(),
                timestamp: timestamp.clone(),
                evidence_count: count,
            }
        })
        .collect()
}

fn fmt_score(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Top three by score, `"<ticker>: <type> (<score>)"` joined by `"; "`,
/// or `"No data"` for an empty pass.
pub fn summarize(signals: &[Signal]) -> String {
    let mut ranked: Vec<&Signal> = signals.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let parts: Vec<String> = ranked
        .into_iter()
        .take(3)
        .map(|s| format!("{}: {} ({})", s.ticker, s.kind.as_str(), fmt_score(s.score)))
        .collect();
    if parts.is_empty() {
        "No data".to_string()
    } else {
        parts.join("; ")
    }
}

/// Mean confidence; 0 for no signals.
pub fn global_confidence(signals: &[Signal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64
}
