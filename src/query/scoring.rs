//! TF-IDF scoring.
//!
//! A matched term contributes `(1 + ln tf) * ln(1 + N / df)`, where `N` is
//! the number of live documents and `df` the number of live documents
//! containing the term. Both factors are positive for any match, so adding a
//! matched clause or raising a frequency never lowers a score.

/// Term frequency weight.
pub fn tf_weight(frequency: u32) -> f32 {
    if frequency == 0 {
        0.0
    } else {
        1.0 + (frequency as f32).ln()
    }
}

/// Inverse document frequency.
pub fn idf(live_docs: usize, doc_frequency: usize) -> f32 {
    if doc_frequency == 0 {
        return 0.0;
    }
    (1.0 + live_docs as f32 / doc_frequency as f32).ln()
}

/// Cosine similarity of two sparse weight vectors sorted by key.
pub fn cosine<K: Ord>(a: &[(K, f32)], b: &[(K, f32)]) -> f32 {
    let norm = |v: &[(K, f32)]| v.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let mut dot = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tf_weight_is_monotonic() {
        assert_eq!(tf_weight(0), 0.0);
        assert_eq!(tf_weight(1), 1.0);
        assert!(tf_weight(3) > tf_weight(2));
    }

    #[test]
    fn test_idf_prefers_rare_terms() {
        assert!(idf(100, 1) > idf(100, 50));
        assert!(idf(1, 1) > 0.0);
        assert_eq!(idf(10, 0), 0.0);
    }

    #[test]
    fn test_cosine() {
        let a = [("cat", 1.0), ("dog", 1.0)];
        let b = [("cat", 1.0), ("dog", 1.0)];
        let c = [("fish", 1.0)];
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&a, &c), 0.0);
        assert_eq!(cosine::<&str>(&[], &a), 0.0);
    }
}
