// src/preproc/mod.rs
//! Pure text stages between fetch and scoring.

pub mod cleaner;
pub mod dedupe;

pub use cleaner::{clean, clean_text};
pub use dedupe::{content_hash, dedupe};
