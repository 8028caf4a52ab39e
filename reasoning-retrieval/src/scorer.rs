//! Hybrid sparse/dense retrieval scorer with top-N and score-gap cutoffs.

use crate::embedding::EmbeddingVector;
use std::collections::HashSet;

/// Default weights used when the caller's `w_sparse + w_dense <= 0`.
pub const DEFAULT_W_SPARSE: f64 = 0.45;
pub const DEFAULT_W_DENSE: f64 = 0.55;

/// A candidate record to be scored against a query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub code: String,
    pub search_text: String,
    pub embedding: Option<EmbeddingVector>,
}

/// A candidate with its final hybrid score, rounded to 6 decimal digits.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub code: String,
    pub score: f64,
}

/// Lowercase, collapse whitespace, and strip punctuation into a token list.
pub fn preprocess(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// `|intersection(query, doc)| / max(|query|, 1)`. Empty query scores 0.
pub fn sparse_score(query_tokens: &[String], doc_tokens: &[String]) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let doc_set: HashSet<&str> = doc_tokens.iter().map(String::as_str).collect();
    let intersection = query_tokens
        .iter()
        .map(String::as_str)
        .collect::<HashSet<&str>>()
        .intersection(&doc_set)
        .count();
    intersection as f64 / (query_tokens.len().max(1)) as f64
}

/// Cosine similarity between query and document embeddings; missing
/// embeddings on either side score 0.
pub fn dense_score(
    query_embedding: Option<&EmbeddingVector>,
    doc_embedding: Option<&EmbeddingVector>,
) -> f64 {
    match (query_embedding, doc_embedding) {
        (Some(q), Some(d)) => q.cosine_similarity(d),
        _ => 0.0,
    }
}

/// Weighted blend of sparse and dense scores; falls back to the default
/// weights when the supplied weights sum to zero or less.
pub fn hybrid_score(sparse: f64, dense: f64, w_sparse: f64, w_dense: f64) -> f64 {
    let (w_sparse, w_dense) = if w_sparse + w_dense <= 0.0 {
        (DEFAULT_W_SPARSE, DEFAULT_W_DENSE)
    } else {
        (w_sparse, w_dense)
    };
    (w_sparse * sparse + w_dense * dense) / (w_sparse + w_dense)
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}

/// Score every candidate against `query`/`query_embedding`, applying any
/// per-index sparse overrides, and return results sorted descending by
/// score with ties broken by input order.
pub fn score_candidates(
    query: &str,
    query_embedding: Option<&EmbeddingVector>,
    candidates: &[Candidate],
    sparse_overrides: Option<&[Option<f64>]>,
    w_sparse: f64,
    w_dense: f64,
) -> Vec<ScoredCandidate> {
    let query_tokens = preprocess(query);

    let mut scored: Vec<(usize, ScoredCandidate)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let doc_tokens = preprocess(&c.search_text);
            let mut sparse = sparse_score(&query_tokens, &doc_tokens);
            if let Some(Some(over)) = sparse_overrides.and_then(|o| o.get(i)) {
                sparse = over.max(0.0);
            }
            let dense = dense_score(query_embedding, c.embedding.as_ref());
            let score = round6(hybrid_score(sparse, dense, w_sparse, w_dense));
            (
                i,
                ScoredCandidate {
                    code: c.code.clone(),
                    score,
                },
            )
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    scored.into_iter().map(|(_, s)| s).collect()
}

/// Walk a descending-sorted score list, stopping once the drop to the next
/// candidate reaches `gap` (when `gap > 0`), and never exceeding `top_n`.
/// Always emits at least one result when the input is non-empty.
pub fn top_n_with_gap(scored: &[ScoredCandidate], top_n: usize, gap: f64) -> Vec<ScoredCandidate> {
    let mut result = Vec::new();
    for (i, candidate) in scored.iter().enumerate() {
        if !result.is_empty() && result.len() >= top_n {
            break;
        }
        if i > 0 && gap > 0.0 && scored[i - 1].score - candidate.score >= gap {
            break;
        }
        result.push(candidate.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_lowercases_and_strips_punctuation() {
        assert_eq!(
            preprocess("Hello,  World!!"),
            vec!["hello".to_string(), "world".to_string()]
        );
    }

    #[test]
    fn sparse_score_empty_query_is_zero() {
        assert_eq!(sparse_score(&[], &["a".to_string()]), 0.0);
    }

    #[test]
    fn sparse_score_counts_intersection_over_query_length() {
        let query = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let doc = vec!["a".to_string(), "b".to_string()];
        assert!((sparse_score(&query, &doc) - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn hybrid_falls_back_to_default_weights_on_nonpositive_sum() {
        let score = hybrid_score(1.0, 0.0, 0.0, 0.0);
        assert!((score - DEFAULT_W_SPARSE).abs() < 1e-9);
    }

    #[test]
    fn scores_sort_descending_with_input_order_tiebreak() {
        let candidates = vec![
            Candidate {
                code: "a".to_string(),
                search_text: "alpha beta".to_string(),
                embedding: None,
            },
            Candidate {
                code: "b".to_string(),
                search_text: "alpha beta".to_string(),
                embedding: None,
            },
        ];
        let scored = score_candidates("alpha beta", None, &candidates, None, 1.0, 0.0);
        assert_eq!(scored[0].code, "a");
        assert_eq!(scored[1].code, "b");
        assert_eq!(scored[0].score, scored[1].score);
    }

    #[test]
    fn sparse_override_replaces_computed_score_clamped_at_zero() {
        let candidates = vec![Candidate {
            code: "a".to_string(),
            search_text: "no overlap here".to_string(),
            embedding: None,
        }];
        let overrides = [Some(-0.5)];
        let scored = score_candidates("query", None, &candidates, Some(&overrides), 1.0, 0.0);
        assert_eq!(scored[0].score, 0.0);
    }

    #[test]
    fn top_n_and_gap_cutoff_matches_spec_example() {
        let scored = vec![
            ScoredCandidate { code: "1".to_string(), score: 0.93 },
            ScoredCandidate { code: "2".to_string(), score: 0.91 },
            ScoredCandidate { code: "3".to_string(), score: 0.52 },
            ScoredCandidate { code: "4".to_string(), score: 0.51 },
        ];

        let result = top_n_with_gap(&scored, 10, 0.2);
        assert_eq!(
            result.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );

        let result = top_n_with_gap(&scored, 2, 1.0);
        assert_eq!(
            result.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
    }

    #[test]
    fn top_n_with_gap_always_emits_at_least_one() {
        let scored = vec![ScoredCandidate { code: "1".to_string(), score: 0.1 }];
        let result = top_n_with_gap(&scored, 0, 0.05);
        assert_eq!(result.len(), 1);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Raising w_sparse while holding w_dense fixed never decreases the
        /// hybrid score of a candidate whose sparse score dominates its
        /// dense score.
        #[test]
        fn hybrid_score_is_monotonic_in_sparse_weight(
            sparse in 0.0f64..1.0,
            dense in 0.0f64..1.0,
            w_sparse_low in 0.01f64..5.0,
            delta in 0.0f64..5.0,
        ) {
            prop_assume!(sparse >= dense);
            let w_sparse_high = w_sparse_low + delta;
            let low = hybrid_score(sparse, dense, w_sparse_low, 1.0);
            let high = hybrid_score(sparse, dense, w_sparse_high, 1.0);
            prop_assert!(high >= low - 1e-9);
        }
    }
}
