//! Capacidad de embeddings inyectable y similitud coseno.
//!
//! El ranker y el refinador reciben un [`Embedder`] por parámetro; en producción
//! es [`EmbeddingManager`] (Rig + OpenAI), en tests un embedder falso determinista.

use std::env;
use std::future::Future;

use anyhow::{anyhow, ensure, Result};
use tracing::debug;

use crate::config::AppConfig;

/// Convierte texto en vectores densos de longitud fija.
pub trait Embedder {
    /// Un vector por texto, en el mismo orden.
    fn embed_texts(&self, texts: Vec<String>) -> impl Future<Output = Result<Vec<Vec<f64>>>>;

    /// Embedding de un único texto (la consulta).
    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Vec<f64>>> {
        let pending = self.embed_texts(vec![text.to_string()]);
        async move {
            pending
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No se pudo generar embedding de la query"))
        }
    }
}

/// Gestor de embeddings sobre Rig (proveedor OpenAI).
#[derive(Debug, Clone)]
pub struct EmbeddingManager {
    pub embedding_model: String,
    pub batch_size: usize,
}

impl EmbeddingManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        // openai::Client::from_env() entra en pánico sin clave; mejor fallar aquí.
        ensure!(
            env::var("OPENAI_API_KEY").is_ok(),
            "Falta OPENAI_API_KEY en el entorno"
        );
        ensure!(cfg.embedding_batch_size > 0, "El tamaño de lote debe ser mayor que 0");
        Ok(Self {
            embedding_model: cfg.llm_embedding_model.clone(),
            batch_size: cfg.embedding_batch_size,
        })
    }
}

impl Embedder for EmbeddingManager {
    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>> {
        use rig::client::EmbeddingsClient as _;
        use rig::embeddings::EmbeddingModel as _;
        use rig::providers::openai::{self, TEXT_EMBEDDING_3_SMALL};

        let client = openai::Client::from_env();
        let model_name = if self.embedding_model.is_empty() {
            TEXT_EMBEDDING_3_SMALL
        } else {
            self.embedding_model.as_str()
        };
        let embedding_model = client.embedding_model(model_name);
        let model = &embedding_model;

        embed_in_batches(texts, self.batch_size, |batch| async move {
            let embeddings = model.embed_texts(batch).await?;
            let vectors: Vec<Vec<f64>> = embeddings.into_iter().map(|emb| emb.vec).collect();
            Ok::<_, anyhow::Error>(vectors)
        })
        .await
    }
}

/// Parte `texts` en lotes de `batch_size` y llama a `embed_batch` con cada uno,
/// en orden. Falla con un lote vacío o si un lote devuelve otro número de vectores.
pub async fn embed_in_batches<F, Fut>(
    texts: Vec<String>,
    batch_size: usize,
    mut embed_batch: F,
) -> Result<Vec<Vec<f64>>>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<f64>>>>,
{
    ensure!(!texts.is_empty(), "Lote de embeddings vacío");
    ensure!(batch_size > 0, "El tamaño de lote debe ser mayor que 0");

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        debug!("Embeddings: lote de {} textos", batch.len());
        let embeddings = embed_batch(batch.to_vec()).await?;
        if embeddings.len() != batch.len() {
            return Err(anyhow!(
                "Número de embeddings ({}) distinto al número de textos ({})",
                embeddings.len(),
                batch.len()
            ));
        }
        vectors.extend(embeddings);
    }

    Ok(vectors)
}

/// Similitud coseno en [-1, 1]. Devuelve 0.0 con vectores de norma cero o
/// longitudes distintas, para que el orden sea siempre total.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}


#[cfg(test)]
mod tests {
    use super::testing::KeywordEmbedder;
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let a = [1.0, 2.0];
        let b = [-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_with_zero_norm_or_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn embed_query_returns_single_vector() {
        let embedder = KeywordEmbedder::animals_and_lorem();
        let vector = tokio_test::block_on(embedder.embed_query("The Fox, the dog")).unwrap();
        assert_eq!(vector, vec![2.0, 0.0, 0.0]);
        assert_eq!(*embedder.calls.borrow(), vec![1]);
    }

    fn ones(batch: &[String]) -> Vec<Vec<f64>> {
        batch.iter().map(|_| vec![1.0]).collect()
    }

    #[test]
    fn batches_respect_size_and_keep_order() {
        let texts: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        let mut seen: Vec<Vec<String>> = Vec::new();

        let vectors = tokio_test::block_on(embed_in_batches(texts, 3, |batch| {
            let out: Vec<Vec<f64>> = batch
                .iter()
                .map(|t| vec![t[1..].parse::<f64>().unwrap()])
                .collect();
            seen.push(batch);
            async move { Ok::<_, anyhow::Error>(out) }
        }))
        .unwrap();

        let sizes: Vec<usize> = seen.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(seen[2], vec!["t6".to_string()]);
        let flat: Vec<f64> = vectors.into_iter().map(|v| v[0]).collect();
        assert_eq!(flat, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn batching_rejects_empty_input_without_calling_provider() {
        let mut calls = 0;
        let result = tokio_test::block_on(embed_in_batches(Vec::new(), 4, |batch| {
            calls += 1;
            let out = ones(&batch);
            async move { Ok::<_, anyhow::Error>(out) }
        }));
        assert!(result.is_err());
        assert_eq!(calls, 0);
    }

    #[test]
    fn batching_fails_when_provider_returns_fewer_vectors() {
        let texts: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let result = tokio_test::block_on(embed_in_batches(texts, 2, |batch| {
            let mut out = ones(&batch);
            out.truncate(1);
            async move { Ok::<_, anyhow::Error>(out) }
        }));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("distinto al número de textos"));
    }

    #[test]
    fn fake_embedder_rejects_empty_batches() {
        let embedder = KeywordEmbedder::animals_and_lorem();
        assert!(tokio_test::block_on(embedder.embed_texts(Vec::new())).is_err());
    }
}
