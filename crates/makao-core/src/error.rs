use uuid::Uuid;

/// Error taxonomy for the reconciliation engine.
///
/// `Store` failures are transient: the candidate stays in its pre-state and
/// is retried on the next scheduled run. `Integrity` failures are not: the
/// candidate is skipped and flagged for manual review.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store failure: {0}")]
    Store(String),

    #[error("{entity} with id {id} does not exist")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("ledger integrity violation: {0}")]
    Integrity(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
