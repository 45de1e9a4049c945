use hyper::client::HttpConnector;
use hyper::Client;
use serde::Serialize;
use thiserror::Error;

use crate::domain::Record;
use crate::infrastructure::chain;
use crate::infrastructure::database::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Record not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => VerifyError::NotFound,
            other => VerifyError::Store(other.to_string()),
        }
    }
}

/// Outcome of the independent on-chain check.
///
/// `Unknown` means the check could not run, which is an operationally
/// different answer from a definitive `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnChainCheck {
    Confirmed,
    Absent,
    Unknown,
}

/// Read-path reconciliation of a stored record against the chain.
///
/// The stored status and the on-chain check are reported side by side; the
/// two can legitimately disagree while a chain node lags, so neither replaces
/// the other. `on_chain` is null for records that were never attested.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub record: Record,
    pub on_chain: Option<OnChainCheck>,
}

pub struct VerifyUseCase {
    store: Box<dyn RecordStore>,
}

impl VerifyUseCase {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Loads a record and, when it carries an attestation, re-checks the
    /// fingerprint against the chain. Never mutates the record.
    pub async fn execute(
        self,
        client: &Client<HttpConnector>,
        gateway_url: &str,
        id: &str,
    ) -> Result<VerificationReport, VerifyError> {
        let record = self.store.get(id)?;

        let on_chain = if record.attestation_id.is_some() {
            Some(
                match chain::fingerprint_exists(client, gateway_url, &record.fingerprint).await {
                    Ok(true) => OnChainCheck::Confirmed,
                    Ok(false) => OnChainCheck::Absent,
                    Err(e) => {
                        eprintln!("On-chain check failed for record {}: {}", id, e);
                        OnChainCheck::Unknown
                    }
                },
            )
        } else {
            None
        };

        Ok(VerificationReport { record, on_chain })
    }
}
