use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::analyzer::{analyze_chunks, AnalyzeOptions};
use crate::chunker::{partition, Chunk};
use crate::completion::CompletionClient;
use crate::error::PipelineError;
use crate::fusion::{synthesize, ConsolidatedReport};
use crate::loader::{load_document, DocumentFormat};
use crate::settings::Settings;
use crate::sink;

/// What a document turns into before any completion call.
#[derive(Debug, Clone)]
pub struct DocumentPlan {
    pub base_name: String,
    pub units: usize,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub units: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub report: ConsolidatedReport,
    pub artifact: PathBuf,
    pub elapsed: Duration,
}

/// Load and partition a document. Fails with `InputError` when nothing usable
/// comes out of it.
pub fn plan_document(
    path: &Path,
    declared: Option<DocumentFormat>,
    settings: &Settings,
) -> Result<DocumentPlan, PipelineError> {
    let units = load_document(path, declared, &settings.load_policy())?;
    let chunks = partition(&units, settings.chunk_size);
    Ok(DocumentPlan {
        base_name: sink::document_base_name(path),
        units: units.len(),
        chunks,
    })
}

/// Document → chunk extractions → consolidated report → artifact.
pub struct Pipeline {
    client: Arc<dyn CompletionClient>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(client: Arc<dyn CompletionClient>, settings: Settings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the whole pipeline once, within the configured wall-clock limit.
    pub async fn run(
        &self,
        path: &Path,
        declared: Option<DocumentFormat>,
    ) -> Result<RunSummary, PipelineError> {
        match self.settings.run_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.execute(path, declared))
                .await
                .map_err(|_| PipelineError::Timeout(limit.as_secs()))?,
            None => self.execute(path, declared).await,
        }
    }

    async fn execute(
        &self,
        path: &Path,
        declared: Option<DocumentFormat>,
    ) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let deadline = self
            .settings
            .analysis_budget()
            .map(|budget| tokio::time::Instant::now() + budget);

        let plan = plan_document(path, declared, &self.settings)?;
        let total = plan.chunks.len();
        info!(
            document = %plan.base_name,
            units = plan.units,
            chunks = total,
            chunk_size = self.settings.chunk_size,
            "Processing {} sentences in {} chunks",
            plan.units,
            total
        );

        let options = AnalyzeOptions {
            concurrency: self.settings.concurrency,
            deadline,
        };
        let results = analyze_chunks(
            Arc::clone(&self.client),
            &self.settings.extraction_params(),
            plan.chunks,
            options,
        )
        .await;
        let failed_chunks = results.iter().filter(|r| r.failed).count();

        let report = synthesize(
            self.client.as_ref(),
            &self.settings.fusion_params(),
            &results,
            &plan.base_name,
        )
        .await;

        let artifact = sink::write_report(&self.settings.out_dir, &report)?;

        Ok(RunSummary {
            units: plan.units,
            chunks: total,
            failed_chunks,
            report,
            artifact,
            elapsed: start.elapsed(),
        })
    }
}

// ── Tests ──
