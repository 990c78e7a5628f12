//! End-to-end case generation.
//!
//! Single entry point that drives the full flow: fetch the internal guide,
//! extract text, append the optional user document, run the staged pipeline,
//! and persist the final case. Uses trait-based DI for the store, extractor
//! and backend so the flow is fully testable with mock implementations.

use std::sync::Arc;

use crate::config::{CaseBuilderConfig, GUIDE_PATH};
use crate::extraction::{DocumentTextExtractor, SourceFormat, TextExtractor};
use crate::pipeline::{
    CancelToken, CasePipeline, ChatBackend, OllamaBackend, PipelineError, RoleSet, RunOutcome,
    RunState, StageOutput,
};
use crate::storage::{FileStore, LocalFileStore};

/// Delimiter placed between the internal guide and an uploaded document.
const USER_DOC_HEADER: &str = "\n\n---\n\nAdditional Context from Uploaded File:\n\n";

/// Store folder that receives generated cases.
const RESULTS_FOLDER: &str = "results";

/// A successfully generated case.
#[derive(Debug)]
pub struct GeneratedCase {
    /// Sanitized final case text.
    pub text: String,
    /// Where the text was persisted, if persistence succeeded.
    pub stored_path: Option<String>,
    /// Terminal state of the run (always `Done` on this path).
    pub state: RunState,
    /// Raw stage outputs in execution order.
    pub outputs: Vec<StageOutput>,
}

/// Orchestrates case generation: load → pipeline → persist.
pub struct CaseGenerator {
    store: Box<dyn FileStore + Send + Sync>,
    extractor: Box<dyn TextExtractor + Send + Sync>,
    backend: Arc<dyn ChatBackend + Send + Sync>,
    roles: RoleSet,
}

impl CaseGenerator {
    pub fn new(
        store: Box<dyn FileStore + Send + Sync>,
        extractor: Box<dyn TextExtractor + Send + Sync>,
        backend: Arc<dyn ChatBackend + Send + Sync>,
        roles: RoleSet,
    ) -> Self {
        Self {
            store,
            extractor,
            backend,
            roles,
        }
    }

    /// Generate a case from the internal guide plus an optional uploaded
    /// document (a path within the file store).
    pub fn generate(
        &self,
        user_doc: Option<&str>,
        user_prompt: &str,
        cancel: CancelToken,
    ) -> Result<GeneratedCase, PipelineError> {
        tracing::info!(user_doc = ?user_doc, "Starting case generation");

        let source_text = self.load_source(user_doc)?;

        let pipeline =
            CasePipeline::with_cancel(Arc::clone(&self.backend), self.roles.clone(), cancel);
        let RunOutcome {
            state,
            outputs,
            result,
        } = pipeline.execute(&source_text, user_prompt);
        let text = result?;

        // Persistence failure is reported but does not void the case.
        let stored_path = match self.store.store(text.as_bytes(), RESULTS_FOLDER, "case.txt") {
            Ok(path) => {
                tracing::info!(path = %path, "Case persisted");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist case — continuing");
                None
            }
        };

        Ok(GeneratedCase {
            text,
            stored_path,
            state,
            outputs,
        })
    }

    /// Like [`generate`](Self::generate), but always yields display text: the
    /// case on success, a short explanatory message on failure. No partial
    /// draft is ever shown.
    pub fn generate_message(
        &self,
        user_doc: Option<&str>,
        user_prompt: &str,
        cancel: CancelToken,
    ) -> String {
        match self.generate(user_doc, user_prompt, cancel) {
            Ok(case) => case.text,
            Err(e) => failure_message(&e),
        }
    }

    /// Combined source: internal guide first, optional user document under a
    /// visible delimiter. One combined text per run.
    fn load_source(&self, user_doc: Option<&str>) -> Result<String, PipelineError> {
        let guide_bytes = self.store.fetch(GUIDE_PATH)?;
        let guide_format = SourceFormat::from_path(GUIDE_PATH)?;
        let mut source_text = self.extractor.extract(&guide_bytes, guide_format)?;

        if let Some(path) = user_doc {
            let format = SourceFormat::from_path(path)?;
            let bytes = self.store.fetch(path)?;
            let text = self.extractor.extract(&bytes, format)?;
            source_text.push_str(USER_DOC_HEADER);
            source_text.push_str(&text);
        }

        Ok(source_text)
    }
}

/// Short user-facing explanation for a failed run.
pub fn failure_message(error: &PipelineError) -> String {
    match error {
        PipelineError::Storage(e) => format!("Failed to load source document: {e}"),
        PipelineError::Extraction(e) => format!("Failed to read source document: {e}"),
        PipelineError::AgentInit(e) => format!("Failed to initialize agents: {e}"),
        PipelineError::Generation { stage, .. } => {
            format!("Case generation failed at the {stage} stage.")
        }
        PipelineError::GenerationTimeout { stage, .. } => {
            format!("Case generation timed out at the {stage} stage.")
        }
        PipelineError::Cancelled => "Case generation was cancelled.".to_string(),
    }
}

/// Build a `CaseGenerator` with production implementations from a validated
/// configuration.
pub fn build_generator(config: &CaseBuilderConfig) -> Result<CaseGenerator, PipelineError> {
    config
        .validate()
        .map_err(|e| PipelineError::AgentInit(e.to_string()))?;

    let roles = match &config.roles_path {
        Some(path) => RoleSet::load(path, &config.model),
        None => RoleSet::embedded(&config.model),
    }
    .map_err(|e| PipelineError::AgentInit(e.to_string()))?;

    let backend = OllamaBackend::new(&config.backend_url, config.stage_timeout())
        .map_err(|e| PipelineError::AgentInit(e.to_string()))?;

    tracing::info!(model = %config.model, backend = %config.backend_url, "Case generator ready");

    Ok(CaseGenerator::new(
        Box::new(LocalFileStore::new(config.store_root.clone())),
        Box::new(DocumentTextExtractor::new()),
        Arc::new(backend),
        roles,
    ))
}
