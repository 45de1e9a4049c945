use thiserror::Error;

use crate::domain::{
    fingerprint_of, initial_status, ChainClaim, ClaimError, FileMeta, FingerprintError, Record,
};
use crate::infrastructure::database::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error(transparent)]
    EmptyInput(#[from] FingerprintError),

    #[error(transparent)]
    IncompleteClaim(#[from] ClaimError),

    #[error("Record '{0}' already exists")]
    AlreadyExists(String),

    #[error("Store error: {0}")]
    Store(String),
}

/// One uploaded file: its bytes plus the metadata kept on the record.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Everything the upload caller supplies for a new record.
#[derive(Debug, Clone)]
pub struct RecordSubmission {
    pub id: String,
    pub patient_ref: String,
    pub holder_ref: String,
    pub files: Vec<FilePayload>,
    pub claimed_fingerprint: Option<String>,
    pub claimed_attestation_id: Option<String>,
}

pub struct SubmitUseCase {
    store: Box<dyn RecordStore>,
}

impl SubmitUseCase {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Creates a record from an upload.
    ///
    /// The fingerprint is always computed from the submitted bytes; the
    /// caller's claim can only upgrade the initial status, never replace the
    /// stored fingerprint. A mismatched claim is logged and the record opens
    /// `pending`.
    pub fn execute(&self, submission: RecordSubmission) -> Result<Record, SubmitError> {
        if submission.id.trim().is_empty() {
            return Err(SubmitError::EmptyField("id"));
        }
        if submission.patient_ref.trim().is_empty() {
            return Err(SubmitError::EmptyField("patient_ref"));
        }
        if submission.holder_ref.trim().is_empty() {
            return Err(SubmitError::EmptyField("holder_ref"));
        }

        let claim = ChainClaim::from_parts(
            submission.claimed_fingerprint,
            submission.claimed_attestation_id,
        )?;

        let buffers: Vec<&[u8]> = submission
            .files
            .iter()
            .map(|f| f.content.as_slice())
            .collect();
        let fingerprint = fingerprint_of(&buffers)?;

        let decision = initial_status(&fingerprint, claim.as_ref());
        if decision.claim_mismatch {
            eprintln!(
                "Claimed fingerprint for record {} does not match computed fingerprint {}; opening as pending",
                submission.id, fingerprint
            );
        }

        let files: Vec<FileMeta> = submission
            .files
            .iter()
            .map(|f| FileMeta {
                name: f.name.clone(),
                mime_type: f.mime_type.clone(),
                size_bytes: f.content.len() as u64,
            })
            .collect();

        let record = Record::new(
            submission.id,
            submission.patient_ref,
            submission.holder_ref,
            fingerprint,
            files,
            decision,
        );

        match self.store.create(&record) {
            Ok(()) => Ok(record),
            Err(StoreError::AlreadyExists) => Err(SubmitError::AlreadyExists(record.id)),
            Err(e) => Err(SubmitError::Store(e.to_string())),
        }
    }
}
