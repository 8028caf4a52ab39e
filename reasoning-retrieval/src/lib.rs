//! reasoning-retrieval - Hybrid Retrieval Scorer and Embedding Provider.

mod embedding;
mod scorer;

pub use embedding::{EmbeddingProvider, EmbeddingVector};
pub use scorer::{
    dense_score, hybrid_score, preprocess, score_candidates, sparse_score, top_n_with_gap,
    Candidate, ScoredCandidate, DEFAULT_W_DENSE, DEFAULT_W_SPARSE,
};
