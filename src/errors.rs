// errors.rs
use std::fmt;

use crate::domain::run::Stage;

/// Errors raised by any pipeline stage.
///
/// `Parse` is the only per-item variant: stages absorb it at the card or
/// record boundary and keep going. The others end the stage in progress.
#[derive(Debug)]
pub enum PipelineError {
    Fetch(String),
    Parse {
        index: Option<usize>,
        message: String,
    },
    Persistence {
        stage: Stage,
        index: Option<usize>,
        message: String,
    },
    Config(String),
    Cancelled,
}

// Type alias used across the stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn parse(index: Option<usize>, message: impl Into<String>) -> Self {
        PipelineError::Parse {
            index,
            message: message.into(),
        }
    }

    pub fn persist(stage: Stage, index: Option<usize>, err: impl fmt::Display) -> Self {
        PipelineError::Persistence {
            stage,
            index,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Fetch(msg) => write!(f, "Fetch error: {msg}"),
            PipelineError::Parse {
                index: Some(i),
                message,
            } => write!(f, "Parse error (card {i}): {message}"),
            PipelineError::Parse {
                index: None,
                message,
            } => write!(f, "Parse error: {message}"),
            PipelineError::Persistence {
                stage,
                index: Some(i),
                message,
            } => write!(f, "Persistence error in {stage} stage (card {i}): {message}"),
            PipelineError::Persistence {
                stage,
                index: None,
                message,
            } => write!(f, "Persistence error in {stage} stage: {message}"),
            PipelineError::Config(msg) => write!(f, "Configuration error: {msg}"),
            PipelineError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {}
