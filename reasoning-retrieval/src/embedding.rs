//! Embedding vectors and the embedding provider.
//!
//! `embed`/`embed_batch` never fail: a remote endpoint failure (network,
//! non-2xx, shape mismatch) degrades to a deterministic hash-based
//! fallback so retrieval stays reproducible in tests and resilient in
//! production.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// An embedding vector tagged with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub data: Vec<f32>,
    pub model_id: String,
}

impl EmbeddingVector {
    pub fn new(data: Vec<f32>, model_id: impl Into<String>) -> Self {
        Self {
            data,
            model_id: model_id.into(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.data.len()
    }

    /// Cosine similarity; mismatched or zero-length vectors score 0.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f64 {
        if self.data.is_empty() || other.data.is_empty() || self.data.len() != other.data.len() {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let (a, b) = (*a as f64, *b as f64);
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[derive(Serialize)]
struct EmbedRequestBody<'a> {
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponseBody {
    embeddings: Vec<Vec<f32>>,
}

/// Batch embedding client with a deterministic fallback.
pub struct EmbeddingProvider {
    client: reqwest::Client,
    endpoint: Option<String>,
    fallback_dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(endpoint: Option<String>, timeout_ms: u64, fallback_dimensions: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            fallback_dimensions,
        }
    }

    /// Embed one text. Never fails.
    pub async fn embed(&self, text: &str) -> EmbeddingVector {
        self.embed_batch(&[text])
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| self.fallback(text))
    }

    /// Embed a batch of texts. Never fails: any remote error degrades to
    /// the hash-based fallback for the whole batch.
    pub async fn embed_batch(&self, texts: &[&str]) -> Vec<EmbeddingVector> {
        if let Some(endpoint) = self.endpoint.clone() {
            match self.try_remote(&endpoint, texts).await {
                Ok(vectors) if vectors.len() == texts.len() => return vectors,
                Ok(vectors) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        expected = texts.len(),
                        got = vectors.len(),
                        "embedding response length mismatch, using fallback"
                    );
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "embedding request failed, using fallback");
                }
            }
        }
        texts.iter().map(|t| self.fallback(t)).collect()
    }

    async fn try_remote(&self, endpoint: &str, texts: &[&str]) -> Result<Vec<EmbeddingVector>, String> {
        let response = self
            .client
            .post(endpoint)
            .json(&EmbedRequestBody { texts })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("embedding endpoint returned {}", response.status()));
        }

        let parsed: EmbedResponseBody = response.json().await.map_err(|e| e.to_string())?;
        Ok(parsed
            .embeddings
            .into_iter()
            .map(|data| EmbeddingVector::new(data, "remote".to_string()))
            .collect())
    }

    /// Deterministic fallback: hash the text, map bytes to floats in
    /// [0,1], repeat to fill the configured dimension, L2-normalize.
    fn fallback(&self, text: &str) -> EmbeddingVector {
        let hash = Sha256::digest(text.as_bytes());
        let mut data = Vec::with_capacity(self.fallback_dimensions);
        for i in 0..self.fallback_dimensions {
            let byte = hash[i % hash.len()];
            data.push(byte as f32 / 255.0);
        }

        let norm: f32 = data.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut data {
                *x /= norm;
            }
        }

        EmbeddingVector::new(data, "hash-fallback".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let a = EmbeddingVector::new(vec![1.0, 2.0, 3.0], "m".to_string());
        let sim = a.cosine_similarity(&a);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_zero_length_vectors_is_zero() {
        let a = EmbeddingVector::new(vec![], "m".to_string());
        let b = EmbeddingVector::new(vec![1.0], "m".to_string());
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[tokio::test]
    async fn fallback_embedding_is_deterministic_and_normalized() {
        let provider = EmbeddingProvider::new(None, 1000, 16);
        let a = provider.embed("hello world").await;
        let b = provider.embed("hello world").await;
        assert_eq!(a.data, b.data);
        assert_eq!(a.dimensions(), 16);

        let norm: f32 = a.data.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn fallback_differs_for_different_text() {
        let provider = EmbeddingProvider::new(None, 1000, 16);
        let a = provider.embed("hello").await;
        let b = provider.embed("world").await;
        assert_ne!(a.data, b.data);
    }

    #[tokio::test]
    async fn unreachable_endpoint_still_returns_a_vector() {
        let provider = EmbeddingProvider::new(Some("http://127.0.0.1:1".to_string()), 50, 8);
        let v = provider.embed("anything").await;
        assert_eq!(v.dimensions(), 8);
    }
}
