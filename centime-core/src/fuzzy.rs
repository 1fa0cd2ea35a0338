//! Approximate string matching with bounded memory.
//!
//! Edit distance keeps two rolling rows of length `min(len) + 1` rather
//! than the full m×n matrix, so memory is O(min(len(a), len(b))).

/// Levenshtein distance over characters, not bytes.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    // Rows span the shorter string.
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr: Vec<usize> = vec![0; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(lc != sc);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Similarity in [0,1]: `1 - distance / max(len(a), len(b), 1)`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count()).max(1);
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        for s in ["", "a", "starbucks", "héllo wörld"] {
            assert_eq!(levenshtein(s, s), 0);
            assert_eq!(similarity(s, s), 1.0);
        }
    }

    #[test]
    fn distance_to_empty_is_length() {
        assert_eq!(levenshtein("starbucks", ""), 9);
        assert_eq!(levenshtein("", "abc"), 3);
        // Character count, not byte count.
        assert_eq!(levenshtein("café", ""), 4);
    }

    #[test]
    fn known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("starbucks", "starbuck"), 1);
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("starbucks", "starbcks"),
            ("whole foods", "wholefoods market"),
            ("", "abc"),
            ("uber trip", "uber eats"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn similarity_stays_in_unit_interval() {
        let pairs = [("a", "zzzzzzzzzz"), ("", ""), ("x", "")];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "similarity({a:?},{b:?}) = {s}");
        }
    }

    #[test]
    fn near_matches_score_high() {
        assert!(similarity("starbucks", "starbucks 4521") > 0.6);
        assert!(similarity("starbucks", "starbcks") > 0.85);
        assert!(similarity("starbucks", "target") < 0.5);
    }
}
