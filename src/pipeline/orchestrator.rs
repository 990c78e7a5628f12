//! Case generation run.
//!
//! One run walks a fixed chain (coverage scan, plan, draft, verify,
//! finalize, sanitize), feeding each stage the full text of the stages it
//! declares as dependencies. The run fails fast: the first stage error ends
//! it, naming the stage, and no partial output is ever surfaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::backend::{BackendError, ChatBackend, ContextEntry};
use super::coverage::scan_coverage;
use super::prompt;
use super::roles::RoleSet;
use super::sanitize::sanitize_case_output;
use super::stage::{Stage, StageOutput, STAGES};
use super::PipelineError;

/// Where a run currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Scanning,
    Planning,
    Drafting,
    Verifying,
    Finalizing,
    Sanitizing,
    Done,
    Failed,
}

impl RunState {
    fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Plan => Self::Planning,
            Stage::Draft => Self::Drafting,
            Stage::Verify => Self::Verifying,
            Stage::Finalize => Self::Finalizing,
        }
    }
}

/// Cooperative cancellation shared between a run and its caller.
///
/// Checked between stages only; an in-flight backend call runs to its
/// timeout rather than being interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    /// Raw stage outputs in execution order; on failure, only the stages
    /// that completed.
    pub outputs: Vec<StageOutput>,
    /// Sanitized final text, or the error that ended the run.
    pub result: Result<String, PipelineError>,
}

/// One pipeline run. `execute` consumes the instance: a run is never reused.
pub struct CasePipeline {
    backend: Arc<dyn ChatBackend + Send + Sync>,
    roles: RoleSet,
    cancel: CancelToken,
}

impl CasePipeline {
    pub fn new(backend: Arc<dyn ChatBackend + Send + Sync>, roles: RoleSet) -> Self {
        Self {
            backend,
            roles,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(
        backend: Arc<dyn ChatBackend + Send + Sync>,
        roles: RoleSet,
        cancel: CancelToken,
    ) -> Self {
        Self {
            backend,
            roles,
            cancel,
        }
    }

    /// Run the full chain over the combined source text.
    ///
    /// `user_prompt` is the request that started the run; it is recorded for
    /// the caller (history, notifications) and does not alter stage prompts.
    pub fn execute(self, source_text: &str, user_prompt: &str) -> RunOutcome {
        let _span = tracing::info_span!("case_run", prompt = user_prompt).entered();

        let mut outputs: Vec<StageOutput> = Vec::with_capacity(STAGES.len());

        // Scanning
        if self.cancel.is_cancelled() {
            return failed(outputs, PipelineError::Cancelled);
        }
        let tokens = scan_coverage(source_text);
        tracing::info!(
            state = ?RunState::Scanning,
            count = tokens.len(),
            "Coverage scan complete"
        );

        // Planning → Drafting → Verifying → Finalizing
        for stage in STAGES {
            let state = RunState::for_stage(stage);
            if self.cancel.is_cancelled() {
                return failed(outputs, PipelineError::Cancelled);
            }

            tracing::info!(stage = %stage, state = ?state, "Stage starting");
            let stage_prompt = prompt::compose(stage, source_text, &tokens);
            let binding = self.roles.get(stage.role());

            let result = {
                let context: Vec<ContextEntry<'_>> = stage
                    .dependencies()
                    .iter()
                    .map(|dep| {
                        let output = outputs
                            .iter()
                            .find(|o| o.stage == *dep)
                            .expect("dependencies precede their stage");
                        ContextEntry {
                            label: dep.as_str(),
                            text: &output.text,
                        }
                    })
                    .collect();
                self.backend.complete(binding, &stage_prompt, &context)
            };

            match result {
                Ok(text) => {
                    tracing::info!(stage = %stage, chars = text.len(), "Stage complete");
                    outputs.push(StageOutput { stage, text });
                }
                Err(e) => {
                    tracing::warn!(stage = %stage, error = %e, "Stage failed");
                    return failed(outputs, stage_error(stage, e));
                }
            }
        }

        // Sanitizing
        if self.cancel.is_cancelled() {
            return failed(outputs, PipelineError::Cancelled);
        }
        tracing::info!(state = ?RunState::Sanitizing, "Sanitizing output");
        let final_text = {
            let finalized = outputs
                .last()
                .expect("finalize output present after all stages");
            sanitize_case_output(source_text, &finalized.text)
        };
        tracing::info!(chars = final_text.len(), "Run complete");

        RunOutcome {
            state: RunState::Done,
            outputs,
            result: Ok(final_text),
        }
    }
}

fn failed(outputs: Vec<StageOutput>, error: PipelineError) -> RunOutcome {
    RunOutcome {
        state: RunState::Failed,
        outputs,
        result: Err(error),
    }
}

fn stage_error(stage: Stage, error: BackendError) -> PipelineError {
    match error {
        BackendError::Timeout(timeout_secs) => PipelineError::GenerationTimeout {
            stage,
            timeout_secs,
        },
        other => PipelineError::Generation {
            stage,
            source: other,
        },
    }
}
