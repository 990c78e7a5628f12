pub mod backend;
pub mod coverage;
pub mod orchestrator;
pub mod prompt;
pub mod roles;
pub mod sanitize;
pub mod stage;

pub use backend::*;
pub use coverage::*;
pub use orchestrator::*;
pub use prompt::*;
pub use roles::*;
pub use sanitize::*;
pub use stage::*;

use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source fetch failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Source extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Agent initialization failed: {0}")]
    AgentInit(String),

    #[error("{stage} stage failed: {source}")]
    Generation {
        stage: stage::Stage,
        #[source]
        source: backend::BackendError,
    },

    #[error("{stage} stage timed out after {timeout_secs}s")]
    GenerationTimeout {
        stage: stage::Stage,
        timeout_secs: u64,
    },

    #[error("Run cancelled")]
    Cancelled,
}
