//! Carga y gestión de configuración del pipeline (rutas, K de ranking y embeddings).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, ensure, Result};

pub const DEFAULT_TOP_SECTIONS: usize = 5;
pub const DEFAULT_TOP_PASSAGES: usize = 5;

/// Parámetros de selección top-K de las dos etapas de ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankingConfig {
    pub top_sections: usize,
    pub top_passages: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_sections: DEFAULT_TOP_SECTIONS,
            top_passages: DEFAULT_TOP_PASSAGES,
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub job_file: String,
    pub output_file: String,

    pub ranking: RankingConfig,

    pub llm_embedding_model: String,
    pub embedding_batch_size: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let input_dir = PathBuf::from(var_or("INPUT_DIR", "/app/input"));
        let output_dir = PathBuf::from(var_or("OUTPUT_DIR", "/app/output"));
        let job_file = var_or("JOB_FILE", "challenge.json");
        let output_file = var_or("OUTPUT_FILE", "output.json");

        let top_sections = parse_positive("TOP_SECTIONS", DEFAULT_TOP_SECTIONS)?;
        let top_passages = parse_positive("TOP_PASSAGES", DEFAULT_TOP_PASSAGES)?;

        let llm_embedding_model = var_or("LLM_EMBEDDING_MODEL", "text-embedding-3-small");
        let embedding_batch_size = parse_positive("EMBEDDING_BATCH_SIZE", 256)?;

        Ok(Self {
            input_dir,
            output_dir,
            job_file,
            output_file,
            ranking: RankingConfig {
                top_sections,
                top_passages,
            },
            llm_embedding_model,
            embedding_batch_size,
        })
    }

    /// Ruta completa del fichero con la descripción del trabajo.
    pub fn job_path(&self) -> PathBuf {
        self.input_dir.join(&self.job_file)
    }

    /// Ruta completa del informe de salida.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Valor inválido para {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Entero > 0; cero o un valor no numérico es un error fatal.
fn parse_positive(key: &str, default: usize) -> Result<usize> {
    let value = parse_var(key, default)?;
    ensure!(value > 0, "{key} debe ser mayor que 0");
    Ok(value)
}
