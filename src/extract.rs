//! Extracción de candidatos: texto por página de cada documento y filtrado de
//! líneas tipo título. Los fallos se aíslan por documento.

use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::Path,
};

use anyhow::{anyhow, Context, Result};
use mime_guess::{mime, MimeGuess};
use tracing::{info, warn};

use crate::models::{CandidateSection, DocumentRef};

/// Mínimo de palabras (separadas por espacios) de una línea candidata.
pub const MIN_TITLE_WORDS: usize = 3;
/// Máximo de caracteres de una línea candidata, tras recortar espacios.
pub const MAX_TITLE_CHARS: usize = 200;

const PAGE_BREAK: char = '\x0c';

/// Capacidad externa: fichero → texto de cada página, en orden.
pub trait PageExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// Extractor de ficheros reales: PDF vía `pdf-extract`, texto plano tal cual.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl PageExtractor for FileExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let guess = MimeGuess::from_path(path).first();
        match guess {
            Some(m) if m == mime::APPLICATION_PDF => extract_pdf_pages(path),
            Some(m) if m.type_() == mime::TEXT => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("No se pudo leer {}", path.display()))?;
                Ok(content.split(PAGE_BREAK).map(str::to_string).collect())
            }
            other => Err(anyhow!(
                "Formato no soportado ({}): {}",
                other.map(|m| m.to_string()).unwrap_or_else(|| "desconocido".to_string()),
                path.display()
            )),
        }
    }
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<String>> {
    // pdf-extract puede entrar en pánico con PDFs corruptos.
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(anyhow!(
            "No se pudo extraer texto del PDF {}: {}",
            path.display(),
            e
        )),
        Err(_) => Err(anyhow!(
            "El extractor de PDF falló de forma inesperada con {}",
            path.display()
        )),
    }
}

/// Resumen de la pasada de extracción sobre todos los documentos.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub documents_scanned: u32,
    pub documents_parsed: u32,
    pub documents_failed: u32,
    pub pages_seen: usize,
    pub candidates_created: usize,
}

impl std::fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} documentos, {} procesados, {} con error. {} páginas y {} candidatos.",
            self.documents_scanned,
            self.documents_parsed,
            self.documents_failed,
            self.pages_seen,
            self.candidates_created
        )
    }
}

/// ¿La línea (ya recortada) sirve como título candidato?
pub fn is_candidate_line(line: &str) -> bool {
    line.split_whitespace().count() >= MIN_TITLE_WORDS && line.chars().count() <= MAX_TITLE_CHARS
}

/// Convierte las páginas de un documento en candidatos: uno por línea que pasa
/// el filtro, con el texto íntegro de la página como `body`.
pub fn extract_candidates(document: &str, pages: &[String]) -> Vec<CandidateSection> {
    let mut candidates = Vec::new();
    for (index, page_text) in pages.iter().enumerate() {
        for line in page_text.split('\n') {
            let clean = line.trim();
            if !is_candidate_line(clean) {
                continue;
            }
            candidates.push(CandidateSection {
                document: document.to_string(),
                page_number: index + 1,
                title: clean.to_string(),
                body: page_text.clone(),
            });
        }
    }
    candidates
}

/// Extrae un documento. `None` si no se pudo abrir o parsear (ya registrado).
pub fn extract_document_pages<E: PageExtractor>(
    extractor: &E,
    input_dir: &Path,
    filename: &str,
) -> Option<Vec<String>> {
    let path = input_dir.join(filename);
    match extractor.extract_pages(&path) {
        Ok(pages) => Some(pages),
        Err(err) => {
            warn!("Error leyendo {}: {err:#}. Saltando documento.", path.display());
            None
        }
    }
}

/// Recorre los documentos en el orden del trabajo y agrega sus candidatos.
pub fn collect_candidates<E: PageExtractor>(
    extractor: &E,
    input_dir: &Path,
    documents: &[DocumentRef],
) -> (Vec<CandidateSection>, ExtractionSummary) {
    let mut summary = ExtractionSummary::default();
    let mut all = Vec::new();

    for doc in documents {
        summary.documents_scanned += 1;
        let Some(pages) = extract_document_pages(extractor, input_dir, &doc.filename) else {
            summary.documents_failed += 1;
            continue;
        };

        let candidates = extract_candidates(&doc.filename, &pages);
        info!(
            "Extraído {}: {} páginas, {} candidatos.",
            doc.filename,
            pages.len(),
            candidates.len()
        );
        summary.documents_parsed += 1;
        summary.pages_seen += pages.len();
        summary.candidates_created += candidates.len();
        all.extend(candidates);
    }

    (all, summary)
}
