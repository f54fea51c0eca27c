//! Pipeline completo de un trabajo.
//!
//! Flujo:
//!   1. Extracción de candidatos de cada documento (fallos aislados por documento).
//!   2. Ranking de todos los candidatos contra la consulta; se quedan los top-K.
//!   3. Refinamiento de pasajes dentro de cada sección elegida.
//!   4. Ensamblado del informe.
//!
//! Todo es secuencial: cada etapa termina antes de empezar la siguiente.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    config::RankingConfig,
    embedding::Embedder,
    extract::{collect_candidates, PageExtractor},
    models::{JobDescription, Passage, Report},
    rank::rank_sections,
    refine::refine_section,
    report::{assemble_report, processing_timestamp},
};

/// Ejecuta el trabajo y devuelve el informe. Sólo los fallos de extracción se
/// recuperan; cualquier otro error aborta el run.
pub async fn run_job<E: Embedder, X: PageExtractor>(
    embedder: &E,
    extractor: &X,
    input_dir: &Path,
    job: &JobDescription,
    ranking: RankingConfig,
) -> Result<Report> {
    let query = job.query();
    info!("Consulta: {query}");

    // 1) Candidatos
    let (candidates, summary) = collect_candidates(extractor, input_dir, &job.documents);
    info!("{summary}");

    // 2) Secciones
    let sections = rank_sections(embedder, candidates, &query, ranking.top_sections).await?;
    info!("{} secciones seleccionadas.", sections.len());
    for s in &sections {
        debug!(
            "#{} {} p.{} ({:.4}): {}",
            s.rank, s.section.document, s.section.page_number, s.score, s.section.title
        );
    }

    // 3) Pasajes, sección a sección
    let mut passages: Vec<Passage> = Vec::new();
    for section in &sections {
        let refined = refine_section(embedder, section, &query, ranking.top_passages).await?;
        if let Some(best) = refined.first() {
            debug!(
                "Sección #{}: {} pasajes, mejor puntuación {:.4}",
                section.rank,
                refined.len(),
                best.score
            );
        }
        passages.extend(refined);
    }
    info!("{} pasajes refinados.", passages.len());

    // 4) Informe
    Ok(assemble_report(job, &sections, &passages, processing_timestamp()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::embedding::testing::KeywordEmbedder;
    use crate::extract::testing::InMemoryExtractor;
    use crate::extract::FileExtractor;
    use crate::report::parse_job;

    const LOREM_PAGE: &str = "Lorem ipsum.\n\n\
        Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n\
        Sed do eiusmod tempor incididunt ut labore.\n\n\
        Ut enim ad minim veniam, quis nostrud exercitation.";

    fn animal_job(docs: &[&str]) -> JobDescription {
        let documents: Vec<String> = docs
            .iter()
            .map(|d| format!(r#"{{"filename": "{d}"}}"#))
            .collect();
        parse_job(&format!(
            r#"{{"documents": [{}], "persona": {{"role": "Researcher"}},
                "job_to_be_done": {{"task": "find animal facts"}}}}"#,
            documents.join(",")
        ))
        .unwrap()
    }

    fn run(extractor: &InMemoryExtractor, job: &JobDescription) -> Report {
        let embedder = KeywordEmbedder::animals_and_lorem();
        tokio_test::block_on(run_job(
            &embedder,
            extractor,
            Path::new("/in"),
            job,
            RankingConfig::default(),
        ))
        .unwrap()
    }

    #[test]
    fn fox_page_outranks_lorem_page() {
        let extractor = InMemoryExtractor::default()
            .with("a.pdf", &["The quick brown fox jumps."])
            .with("b.pdf", &[LOREM_PAGE]);
        let job = animal_job(&["a.pdf", "b.pdf"]);

        let report = run(&extractor, &job);

        let sections = &report.extracted_sections;
        assert_eq!(sections[0].document, "a.pdf");
        assert_eq!(sections[0].section_title, "The quick brown fox jumps.");
        assert_eq!(sections[0].importance_rank, 1);
        assert!(sections.iter().skip(1).all(|s| s.document == "b.pdf"));
        let ranks: Vec<usize> = sections.iter().map(|s| s.importance_rank).collect();
        assert_eq!(ranks, (1..=sections.len()).collect::<Vec<_>>());

        assert_eq!(report.subsection_analysis[0].refined_text, "The quick brown fox jumps.");
        for sub in &report.subsection_analysis {
            let source = if sub.document == "a.pdf" {
                "The quick brown fox jumps."
            } else {
                LOREM_PAGE
            };
            assert!(source.contains(&sub.refined_text));
        }
        assert_eq!(report.metadata.input_documents, vec!["a.pdf", "b.pdf"]);
        assert_eq!(report.metadata.persona, "Researcher");
    }

    #[test]
    fn passages_follow_section_order_and_are_capped_per_section() {
        let extractor = InMemoryExtractor::default()
            .with("a.pdf", &["The quick brown fox jumps."])
            .with("b.pdf", &[LOREM_PAGE]);
        let report = run(&extractor, &animal_job(&["a.pdf", "b.pdf"]));

        // a.pdf aporta 1 pasaje; cada sección de b.pdf aporta sus 4 párrafos.
        let b_sections = report
            .extracted_sections
            .iter()
            .filter(|s| s.document == "b.pdf")
            .count();
        assert_eq!(report.subsection_analysis.len(), 1 + 4 * b_sections);
        assert_eq!(report.subsection_analysis[0].document, "a.pdf");
    }

    #[test]
    fn broken_document_does_not_abort_the_run() {
        let extractor = InMemoryExtractor::default().with("a.pdf", &["The quick brown fox jumps."]);
        let report = run(&extractor, &animal_job(&["corrupt.pdf", "a.pdf"]));

        assert_eq!(report.extracted_sections.len(), 1);
        assert_eq!(report.extracted_sections[0].document, "a.pdf");
        assert_eq!(report.metadata.input_documents, vec!["corrupt.pdf", "a.pdf"]);
    }

    #[test]
    fn no_qualifying_lines_yield_an_empty_report() {
        let extractor = InMemoryExtractor::default()
            .with("a.pdf", &["two words\nshort", ""])
            .with("b.pdf", &[]);
        let report = run(&extractor, &animal_job(&["a.pdf", "b.pdf"]));

        assert!(report.extracted_sections.is_empty());
        assert!(report.subsection_analysis.is_empty());
    }

    #[test]
    fn repeated_runs_are_identical_apart_from_timestamp() {
        let extractor = InMemoryExtractor::default()
            .with("a.pdf", &["The quick brown fox jumps.", "Wolf and dog notes here"])
            .with("b.pdf", &[LOREM_PAGE]);
        let job = animal_job(&["a.pdf", "b.pdf"]);

        let first = run(&extractor, &job);
        let second = run(&extractor, &job);

        assert_eq!(first.extracted_sections, second.extracted_sections);
        assert_eq!(first.subsection_analysis, second.subsection_analysis);
    }

    #[test]
    fn top_k_limits_are_honored() {
        let pages: Vec<String> = (0..8)
            .map(|i| format!("Fox page number {i}\n\nA wolf\n\nA dog\n\nlorem ipsum dolor"))
            .collect();
        let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
        let extractor = InMemoryExtractor::default().with("many.pdf", &page_refs);
        let embedder = KeywordEmbedder::animals_and_lorem();

        let report = tokio_test::block_on(run_job(
            &embedder,
            &extractor,
            Path::new("/in"),
            &animal_job(&["many.pdf"]),
            RankingConfig {
                top_sections: 3,
                top_passages: 2,
            },
        ))
        .unwrap();

        assert_eq!(report.extracted_sections.len(), 3);
        assert_eq!(report.subsection_analysis.len(), 6);
    }

    #[test]
    fn end_to_end_with_text_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("animals.txt"), "The quick brown fox jumps.").unwrap();
        fs::write(dir.path().join("filler.md"), LOREM_PAGE).unwrap();
        fs::write(dir.path().join("broken.pdf"), b"%PDF-garbage").unwrap();
        let job = animal_job(&["animals.txt", "broken.pdf", "filler.md"]);
        let embedder = KeywordEmbedder::animals_and_lorem();

        let report = tokio_test::block_on(run_job(
            &embedder,
            &FileExtractor,
            dir.path(),
            &job,
            RankingConfig::default(),
        ))
        .unwrap();

        assert_eq!(report.extracted_sections[0].document, "animals.txt");
        assert!(report
            .extracted_sections
            .iter()
            .all(|s| s.document != "broken.pdf"));
    }
}
