// Engine error taxonomy
// Validation failures are caller errors (400), store failures are server errors (500).
// "Nothing found" is not an error: lookups return Option.

use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Store(err)
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
