//! Lectura de la descripción del trabajo y ensamblado/escritura del informe.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::models::{
    ExtractedSection, JobDescription, Metadata, Passage, RankedSection, Report,
    SubsectionAnalysis,
};

/// Lee y valida el JSON del trabajo. Cualquier campo obligatorio ausente es fatal.
pub fn load_job(path: &Path) -> Result<JobDescription> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("No se pudo leer el trabajo {}", path.display()))?;
    parse_job(&raw).with_context(|| format!("Trabajo mal formado en {}", path.display()))
}

pub fn parse_job(raw: &str) -> Result<JobDescription> {
    Ok(serde_json::from_str(raw)?)
}

/// Hora local con formato `YYYY-MM-DDTHH:MM:SS`.
pub fn processing_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Transformación pura: trabajo + secciones + pasajes → informe.
pub fn assemble_report(
    job: &JobDescription,
    sections: &[RankedSection],
    passages: &[Passage],
    timestamp: String,
) -> Report {
    Report {
        metadata: Metadata {
            input_documents: job.filenames(),
            persona: job.persona.role.clone(),
            job_to_be_done: job.job_to_be_done.task.clone(),
            processing_timestamp: timestamp,
        },
        extracted_sections: sections
            .iter()
            .map(|s| ExtractedSection {
                document: s.section.document.clone(),
                section_title: s.section.title.clone(),
                importance_rank: s.rank,
                page_number: s.section.page_number,
            })
            .collect(),
        subsection_analysis: passages
            .iter()
            .map(|p| SubsectionAnalysis {
                document: p.document.clone(),
                refined_text: p.text.clone(),
                page_number: p.page_number,
            })
            .collect(),
    }
}

/// Escribe el informe como JSON con sangría de 2 espacios (UTF-8 sin escapar).
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("No se pudo crear {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)
        .with_context(|| format!("No se pudo escribir el informe {}", path.display()))?;
    info!("Informe escrito en {}", path.display());
    Ok(())
}
