//! Merchant/description text normalization with a bounded cache.
//!
//! Normalization is deterministic: lowercase, fold common diacritics,
//! turn punctuation into spaces, collapse runs. The cache is FIFO-bounded;
//! when full the oldest entry is evicted before inserting, so the cache
//! stays effective under changing traffic instead of freezing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

/// Thread-safe normalizer. `normalize` never fails; empty input yields "".
#[derive(Debug)]
pub struct Normalizer {
    cache: Mutex<CacheInner>,
    capacity: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let mut cache = self.cache.lock().expect("normalizer cache lock poisoned");
        if let Some(hit) = cache.entries.get(text) {
            return hit.clone();
        }

        let normalized = normalize_uncached(text);
        if cache.entries.len() >= self.capacity {
            // Evict the oldest entry to stay within the bound.
            if let Some(oldest) = cache.order.pop_front() {
                cache.entries.remove(&oldest);
            }
        }
        cache.order.push_back(text.to_string());
        cache.entries.insert(text.to_string(), normalized.clone());
        normalized
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.cache.lock().unwrap().entries.len()
    }
}

/// The pure transformation, no cache involved.
pub fn normalize_uncached(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = true;
    for ch in text.trim().chars() {
        let folded = fold_diacritic(ch);
        if folded.is_alphanumeric() {
            for lower in folded.to_lowercase() {
                out.push(lower);
            }
            previous_space = false;
        } else if !previous_space {
            out.push(' ');
            previous_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Fold common Latin accents to their ASCII base letter.
fn fold_diacritic(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("STARBUCKS #4521"), "starbucks 4521");
        assert_eq!(n.normalize("Whole-Foods  Market!!"), "whole foods market");
    }

    #[test]
    fn folds_diacritics() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("Café Río"), "cafe rio");
    }

    #[test]
    fn empty_and_blank_input_normalize_to_empty() {
        let n = Normalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
    }

    #[test]
    fn cached_and_uncached_agree() {
        let n = Normalizer::new();
        for raw in ["AMZN Mktp US*2B4", "H-E-B #612", "  uber   *trip  "] {
            assert_eq!(n.normalize(raw), normalize_uncached(raw));
            // Second call hits the cache path.
            assert_eq!(n.normalize(raw), normalize_uncached(raw));
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let n = Normalizer::with_capacity(2);
        n.normalize("one");
        n.normalize("two");
        n.normalize("three");
        assert_eq!(n.cached_len(), 2);
        // Still correct after eviction.
        assert_eq!(n.normalize("one"), "one");
        assert_eq!(n.cached_len(), 2);
    }
}
