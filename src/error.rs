use thiserror::Error;

use crate::providers::ProviderError;
use crate::terraform::state::StateError;
use crate::verifier::VerifyError;

#[derive(Debug, Error)]
pub enum ScalecheckError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("configuration error: {0}")]
    Config(String),

    /// One or more scenario checks did not hold.
    #[error("{failed} of {total} checks failed")]
    ChecksFailed { failed: usize, total: usize },
}
