use hyper::client::HttpConnector;
use hyper::Client;
use thiserror::Error;

use crate::domain::{DecideAction, Record, RecordStatus};
use crate::infrastructure::chain::{self, ChainError};
use crate::infrastructure::database::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum DecideError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already decided")]
    AlreadyDecided,

    #[error("decided_by must not be empty")]
    MissingDecider,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for DecideError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DecideError::NotFound,
            StoreError::AlreadyDecided => DecideError::AlreadyDecided,
            other => DecideError::Store(other.to_string()),
        }
    }
}

pub struct DecideUseCase {
    store: Box<dyn RecordStore>,
}

impl DecideUseCase {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Applies an admin decision to a pending record.
    ///
    /// A verifying decision needs an attestation: when none exists yet, the
    /// fingerprint is submitted to the chain gateway first and the status is
    /// committed only once that submission has a definitive outcome. If the
    /// submission fails, the record stays pending and the failure is returned
    /// as-is — no identifier is ever fabricated. The commit itself is a
    /// compare-and-set, so a concurrent decision surfaces as `AlreadyDecided`
    /// rather than a double transition.
    pub async fn execute(
        self,
        client: &Client<HttpConnector>,
        gateway_url: &str,
        id: &str,
        action: DecideAction,
        decided_by: &str,
    ) -> Result<Record, DecideError> {
        if decided_by.trim().is_empty() {
            return Err(DecideError::MissingDecider);
        }

        let record = self.store.get(id)?;
        if record.status != RecordStatus::Pending {
            return Err(DecideError::AlreadyDecided);
        }

        let attestation_id = match action {
            DecideAction::Reject => None,
            DecideAction::Verify => match record.attestation_id {
                Some(existing) => Some(existing),
                None => {
                    Some(chain::submit_fingerprint(client, gateway_url, &record.fingerprint).await?)
                }
            },
        };

        Ok(self
            .store
            .decide(id, action, decided_by, attestation_id.as_deref())?)
    }
}
