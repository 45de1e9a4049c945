use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fingerprint::is_canonical;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Verified,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Verified => "verified",
            RecordStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RecordStatus::Pending),
            "verified" => Some(RecordStatus::Verified),
            "rejected" => Some(RecordStatus::Rejected),
            _ => None,
        }
    }

    /// `verified` and `rejected` are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordStatus::Pending)
    }
}

/// Admin decision on a pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecideAction {
    Verify,
    Reject,
}

impl DecideAction {
    pub fn target_status(&self) -> RecordStatus {
        match self {
            DecideAction::Verify => RecordStatus::Verified,
            DecideAction::Reject => RecordStatus::Rejected,
        }
    }
}

/// Descriptive metadata for one uploaded file, kept in upload order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Claimed fingerprint and attestation id must be supplied together")]
    Incomplete,
}

/// An uploader's assertion that the fingerprint was already attested
/// on-chain before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainClaim {
    pub fingerprint: String,
    pub attestation_id: String,
}

impl ChainClaim {
    /// Builds a claim from the two optional upload fields. Supplying one
    /// without the other (or either blank) is a caller error, not a silent
    /// downgrade to no-claim.
    pub fn from_parts(
        fingerprint: Option<String>,
        attestation_id: Option<String>,
    ) -> Result<Option<Self>, ClaimError> {
        match (fingerprint, attestation_id) {
            (None, None) => Ok(None),
            (Some(fingerprint), Some(attestation_id))
                if !fingerprint.trim().is_empty() && !attestation_id.trim().is_empty() =>
            {
                Ok(Some(Self {
                    fingerprint,
                    attestation_id,
                }))
            }
            _ => Err(ClaimError::Incomplete),
        }
    }
}

/// Outcome of the initial-status decision for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialDecision {
    pub status: RecordStatus,
    pub attestation_id: Option<String>,
    pub claim_mismatch: bool,
}

/// Decides the status a new record opens with.
///
/// The stored fingerprint is always the server-computed one. A claim only
/// upgrades the record to `verified` when its fingerprint (trimmed,
/// lowercased) equals ours; anything else falls back to `pending` with the
/// mismatch flagged so the caller can log it. The chain is not re-read here
/// — the read path re-verifies attested records independently.
pub fn initial_status(server_fingerprint: &str, claim: Option<&ChainClaim>) -> InitialDecision {
    let claim = match claim {
        Some(claim) => claim,
        None => {
            return InitialDecision {
                status: RecordStatus::Pending,
                attestation_id: None,
                claim_mismatch: false,
            }
        }
    };

    let claimed = claim.fingerprint.trim().to_ascii_lowercase();
    if !is_canonical(&claimed) || claimed != server_fingerprint {
        return InitialDecision {
            status: RecordStatus::Pending,
            attestation_id: None,
            claim_mismatch: true,
        };
    }

    InitialDecision {
        status: RecordStatus::Verified,
        attestation_id: Some(claim.attestation_id.clone()),
        claim_mismatch: false,
    }
}

/// The unit of persistence. Records are append-only: `fingerprint` and `id`
/// never change, and `status` moves at most once, from `pending` to a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub patient_ref: String,
    pub holder_ref: String,
    pub fingerprint: String,
    pub attestation_id: Option<String>,
    pub status: RecordStatus,
    pub created_at: i64,
    pub decided_at: Option<i64>,
    pub decided_by: Option<String>,
    pub files: Vec<FileMeta>,
}

impl Record {
    /// Marker stamped into `decided_by` when a record opens `verified`
    /// through a trusted client chain-proof rather than an admin decision.
    pub const DECIDED_BY_CHAIN_PROOF: &'static str = "blockchain";

    pub fn new(
        id: String,
        patient_ref: String,
        holder_ref: String,
        fingerprint: String,
        files: Vec<FileMeta>,
        decision: InitialDecision,
    ) -> Self {
        let created_at = chrono::Utc::now().timestamp();

        // A record that opens in a terminal state left `pending` at creation,
        // so the audit stamps coincide with it.
        let (decided_at, decided_by) = if decision.status.is_terminal() {
            (
                Some(created_at),
                Some(Self::DECIDED_BY_CHAIN_PROOF.to_string()),
            )
        } else {
            (None, None)
        };

        Self {
            id,
            patient_ref,
            holder_ref,
            fingerprint,
            attestation_id: decision.attestation_id,
            status: decision.status,
            created_at,
            decided_at,
            decided_by,
            files,
        }
    }
}
