//! Failure modes of the question-to-insight pipeline.
//!
//! Every stage error aborts the request. The HTTP layer reports the
//! `Display` text of these variants and nothing else.

use crate::llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The database (or its catalog metadata) could not be reached.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// The generated SQL failed to execute, or execution timed out.
    #[error("{0}")]
    QueryExecution(String),

    /// The completion service failed, timed out, or returned nothing.
    #[error(transparent)]
    Generation(#[from] LlmError),

    /// A chart measure could not be converted to a number.
    #[error("could not convert {value} to float")]
    Coercion { value: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
