//! Refinamiento: dentro de cada sección elegida, re-ranking de sus párrafos
//! contra la misma consulta.

use anyhow::{anyhow, Result};

use crate::{
    embedding::{cosine_similarity, Embedder},
    models::{Passage, RankedSection},
    rank::select_top_k,
};

/// Parte el texto por líneas en blanco (`"\n\n"`) y recorta cada trozo.
/// Los trozos que quedan vacíos tras recortar se descartan (a diferencia de un
/// `split` literal), así nunca se envía un texto vacío al proveedor de embeddings.
pub fn split_into_passages(body: &str) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Devuelve los `k` pasajes de `section` más parecidos a `query`, en orden
/// descendente de similitud. Cada sección se refina de forma independiente.
pub async fn refine_section<E: Embedder>(
    embedder: &E,
    section: &RankedSection,
    query: &str,
    k: usize,
) -> Result<Vec<Passage>> {
    let chunks = split_into_passages(&section.section.body);
    if chunks.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    // Consulta y trozos en un solo lote: la consulta va en la posición 0.
    let mut batch = Vec::with_capacity(chunks.len() + 1);
    batch.push(query.to_string());
    batch.extend(chunks.iter().cloned());

    let mut vectors = embedder.embed_texts(batch).await?.into_iter();
    let query_vec = vectors
        .next()
        .ok_or_else(|| anyhow!("No se pudo generar embedding de la query"))?;
    let chunk_vecs: Vec<Vec<f64>> = vectors.collect();
    if chunk_vecs.len() != chunks.len() {
        return Err(anyhow!(
            "Número de embeddings ({}) distinto al número de pasajes ({})",
            chunk_vecs.len(),
            chunks.len()
        ));
    }

    let scored: Vec<(String, f64)> = chunks
        .into_iter()
        .zip(&chunk_vecs)
        .map(|(text, v)| {
            let score = cosine_similarity(&query_vec, v);
            (text, score)
        })
        .collect();

    Ok(select_top_k(scored, k)
        .into_iter()
        .map(|(text, score)| Passage {
            document: section.section.document.clone(),
            page_number: section.section.page_number,
            text,
            score,
        })
        .collect())
}
