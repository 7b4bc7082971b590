//! Tolerant field extractors shared by every source adapter.
//!
//! None of these fail: a missing node or odd text degrades to a sentinel
//! ("Unknown", -1 or `TriState::Unknown`) so one field never discards an
//! otherwise usable listing.

use crate::models::TriState;
use anyhow::{Context, Result};
use regex::Regex;
use scraper::ElementRef;

pub const UNKNOWN_TEXT: &str = "Unknown";

/// Compiles a case-insensitive search pattern.
pub fn pattern(src: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", src)).with_context(|| format!("Invalid pattern '{}'", src))
}

pub fn text_of(node: Option<ElementRef>) -> String {
    match node {
        Some(el) => el.text().collect::<String>().trim().to_string(),
        None => UNKNOWN_TEXT.to_string(),
    }
}

/// Keeps only the ASCII digits of the node text ("€1.400,-" -> 1400).
pub fn int_of(node: Option<ElementRef>) -> i64 {
    if node.is_none() {
        return -1;
    }

    let digits: String = text_of(node).chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(-1)
}

pub fn bool_of(node: Option<ElementRef>, pattern: &Regex) -> TriState {
    match node {
        Some(_) => pattern.is_match(&text_of(node)).into(),
        None => TriState::Unknown,
    }
}

/// True when every word appears somewhere in the node text as a whole word.
pub fn all_words_of(node: Option<ElementRef>, words: &[Regex]) -> TriState {
    match node {
        Some(_) => {
            let text = text_of(node);
            words.iter().all(|w| w.is_match(&text)).into()
        }
        None => TriState::Unknown,
    }
}
