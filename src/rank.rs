//! Ranking de secciones candidatas contra la consulta (top-K por similitud coseno).

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::{
    embedding::{cosine_similarity, Embedder},
    models::{CandidateSection, RankedSection},
};

/// Selecciona los `k` elementos de mayor puntuación, en orden descendente.
/// Los empates se resuelven por posición original, de modo que el resultado es
/// determinista.
pub fn select_top_k<T>(scored: Vec<(T, f64)>, k: usize) -> Vec<(T, f64)> {
    let mut indexed: Vec<(usize, T, f64)> = scored
        .into_iter()
        .enumerate()
        .map(|(i, (item, score))| (i, item, score))
        .collect();
    indexed.sort_unstable_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
    indexed.truncate(k);
    indexed.into_iter().map(|(_, item, score)| (item, score)).collect()
}

/// Textos distintos a embeber y, por candidato, el índice de su texto.
fn dedup_bodies(candidates: &[CandidateSection]) -> (Vec<String>, Vec<usize>) {
    let mut unique_bodies: Vec<String> = Vec::new();
    let mut body_slot: HashMap<&str, usize> = HashMap::new();
    let slots = candidates
        .iter()
        .map(|c| {
            *body_slot.entry(c.body.as_str()).or_insert_with(|| {
                unique_bodies.push(c.body.clone());
                unique_bodies.len() - 1
            })
        })
        .collect();
    (unique_bodies, slots)
}

/// Puntúa cada candidato por su `body` y se queda con los `k` mejores,
/// asignando `rank` 1..=k.
///
/// Sin candidatos no se llama al embedder y el resultado es vacío. Los `body`
/// repetidos (varias líneas de una misma página) se embeben una sola vez.
pub async fn rank_sections<E: Embedder>(
    embedder: &E,
    candidates: Vec<CandidateSection>,
    query: &str,
    k: usize,
) -> Result<Vec<RankedSection>> {
    if candidates.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let query_vec = embedder.embed_query(query).await?;

    let (unique_bodies, slots) = dedup_bodies(&candidates);

    let unique_count = unique_bodies.len();
    let body_vecs = embedder.embed_texts(unique_bodies).await?;
    if body_vecs.len() != unique_count {
        return Err(anyhow!(
            "Número de embeddings ({}) distinto al número de páginas ({})",
            body_vecs.len(),
            unique_count
        ));
    }
    let body_scores: Vec<f64> = body_vecs
        .iter()
        .map(|v| cosine_similarity(&query_vec, v))
        .collect();

    info!(
        "Ranking de {} candidatos ({} páginas distintas).",
        candidates.len(),
        unique_count
    );

    let scored: Vec<(CandidateSection, f64)> = candidates
        .into_iter()
        .zip(slots)
        .map(|(c, slot)| (c, body_scores[slot]))
        .collect();

    Ok(select_top_k(scored, k)
        .into_iter()
        .enumerate()
        .map(|(position, (section, score))| RankedSection {
            section,
            rank: position + 1,
            score,
        })
        .collect())
}
