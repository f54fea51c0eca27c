//! Modelos de dominio: descripción del trabajo, candidatos, pasajes e informe final.

use serde::{Deserialize, Serialize};

// --- Entrada: descripción del trabajo ---

#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobToBeDone {
    pub task: String,
}

/// Referencia a un documento de entrada. Otros campos (p.ej. `title`) se ignoran.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRef {
    pub filename: String,
}

/// Descripción del trabajo leída al inicio (`challenge.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct JobDescription {
    pub persona: Persona,
    pub job_to_be_done: JobToBeDone,
    pub documents: Vec<DocumentRef>,
}

impl JobDescription {
    /// Consulta única del run: persona y tarea concatenadas.
    pub fn query(&self) -> String {
        format!("{}. Task: {}", self.persona.role, self.job_to_be_done.task)
    }

    pub fn filenames(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.filename.clone()).collect()
    }
}

// --- Unidades de ranking ---

/// Una línea filtrada de una página. Se puntúa con el texto completo de la página
/// (`body`); la línea sólo aporta el título que se reporta.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSection {
    pub document: String,
    /// Índice de página, base 1.
    pub page_number: usize,
    pub title: String,
    pub body: String,
}

/// Candidato que sobrevivió al top-K de secciones.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSection {
    pub section: CandidateSection,
    /// Posición 1..=K.
    pub rank: usize,
    pub score: f64,
}

/// Trozo tipo párrafo del `body` de una sección.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub document: String,
    pub page_number: usize,
    pub text: String,
    pub score: f64,
}

// --- Salida: informe ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub importance_rank: usize,
    pub page_number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: usize,
}

/// Informe final. El orden de ambas listas es significativo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: Metadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}
