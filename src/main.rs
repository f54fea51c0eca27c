// Módulos de la aplicación
mod config;
mod embedding;
mod extract;
mod models;
mod pipeline;
mod rank;
mod refine;
mod report;

use std::{fs, process::ExitCode, time::Instant};

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{embedding::EmbeddingManager, extract::FileExtractor};

// Un único hilo: el pipeline es secuencial de principio a fin.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let start = Instant::now();
    if let Err(err) = run().await {
        error!("❌ Error fatal, no se escribe informe: {err:#}");
        return ExitCode::FAILURE;
    }

    info!("✅ Hecho en {:.2}s", start.elapsed().as_secs_f64());
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    // 2. Cargar configuración y trabajo
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;
    let job = report::load_job(&cfg.job_path())?;
    info!(
        "Trabajo cargado: {} documentos, persona '{}'.",
        job.documents.len(),
        job.persona.role
    );

    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("No se pudo crear {}", cfg.output_dir.display()))?;

    // 3. Inicializar embeddings
    let embedder =
        EmbeddingManager::from_config(&cfg).context("Error inicializando el gestor de embeddings")?;

    // 4. Ejecutar el pipeline y escribir el informe
    let report =
        pipeline::run_job(&embedder, &FileExtractor, &cfg.input_dir, &job, cfg.ranking).await?;
    report::write_report(&cfg.output_path(), &report)?;

    Ok(())
}
