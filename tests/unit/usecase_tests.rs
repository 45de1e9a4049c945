use medledger::application::{
    DecideError, DecideUseCase, FilePayload, RecordSubmission, SubmitError, SubmitUseCase,
    VerifyError, VerifyUseCase,
};
use medledger::domain::{fingerprint_of, DecideAction, FileMeta, Record, RecordStatus};
use medledger::infrastructure::database::{RecordStore, SqliteStore};

// A gateway URL nothing listens on; only used by paths that must not or
// cannot reach the chain.
const DEAD_GATEWAY: &str = "http://127.0.0.1:9";

fn file(name: &str, content: &[u8]) -> FilePayload {
    FilePayload {
        name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        content: content.to_vec(),
    }
}

fn submission(id: &str, files: Vec<FilePayload>) -> RecordSubmission {
    RecordSubmission {
        id: id.to_string(),
        patient_ref: "Jane Doe".to_string(),
        holder_ref: "General Hospital".to_string(),
        files,
        claimed_fingerprint: None,
        claimed_attestation_id: None,
    }
}

fn pending_record(id: &str) -> Record {
    Record {
        id: id.to_string(),
        patient_ref: "Jane Doe".to_string(),
        holder_ref: "General Hospital".to_string(),
        fingerprint: fingerprint_of(&[id.as_bytes()]).unwrap(),
        attestation_id: None,
        status: RecordStatus::Pending,
        created_at: 1000,
        decided_at: None,
        decided_by: None,
        files: vec![FileMeta {
            name: "scan.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 4,
        }],
    }
}

#[cfg(test)]
mod submit_tests {
    use super::*;

    #[test]
    fn test_submit_without_claim_is_pending() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let record = usecase
            .execute(submission("MR0001", vec![file("scan.pdf", b"abc")]))
            .unwrap();

        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.attestation_id, None);
        assert_eq!(
            record.fingerprint,
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_submit_with_matching_claim_is_verified() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let mut sub = submission("MR0001", vec![file("scan.pdf", b"abc")]);
        sub.claimed_fingerprint = Some(fingerprint_of(&[b"abc"]).unwrap());
        sub.claimed_attestation_id = Some("0xtx99".to_string());

        let record = usecase.execute(sub).unwrap();

        assert_eq!(record.status, RecordStatus::Verified);
        assert_eq!(record.attestation_id.as_deref(), Some("0xtx99"));
    }

    #[test]
    fn test_submit_with_mismatched_claim_stays_pending() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let mut sub = submission("MR0001", vec![file("scan.pdf", b"abc")]);
        sub.claimed_fingerprint = Some(fingerprint_of(&[b"not the upload"]).unwrap());
        sub.claimed_attestation_id = Some("0xtx99".to_string());

        let record = usecase.execute(sub).unwrap();

        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.attestation_id, None);
    }

    #[test]
    fn test_submit_with_half_claim_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let mut sub = submission("MR0001", vec![file("scan.pdf", b"abc")]);
        sub.claimed_attestation_id = Some("0xtx99".to_string());

        let result = usecase.execute(sub);
        assert!(matches!(result, Err(SubmitError::IncompleteClaim(_))));
    }

    #[test]
    fn test_submit_without_files_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let result = usecase.execute(submission("MR0001", Vec::new()));
        assert!(matches!(result, Err(SubmitError::EmptyInput(_))));
    }

    #[test]
    fn test_submit_with_blank_refs_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        let mut sub = submission("MR0001", vec![file("scan.pdf", b"abc")]);
        sub.holder_ref = "  ".to_string();

        let result = usecase.execute(sub);
        assert!(matches!(result, Err(SubmitError::EmptyField("holder_ref"))));
    }

    #[test]
    fn test_submit_duplicate_id_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = SubmitUseCase::new(Box::new(store));

        usecase
            .execute(submission("MR0001", vec![file("a.pdf", b"first")]))
            .unwrap();
        let result = usecase.execute(submission("MR0001", vec![file("b.pdf", b"second")]));

        assert!(matches!(result, Err(SubmitError::AlreadyExists(_))));
    }
}

#[cfg(test)]
mod decide_tests {
    use super::*;

    #[tokio::test]
    async fn test_reject_needs_no_chain() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&pending_record("MR0001")).unwrap();
        let usecase = DecideUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let record = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001", DecideAction::Reject, "admin")
            .await
            .unwrap();

        assert_eq!(record.status, RecordStatus::Rejected);
        assert_eq!(record.attestation_id, None);
        assert_eq!(record.decided_by.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_decide_missing_record_is_not_found() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = DecideUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let result = usecase
            .execute(&client, DEAD_GATEWAY, "missing", DecideAction::Reject, "admin")
            .await;

        assert!(matches!(result, Err(DecideError::NotFound)));
    }

    #[tokio::test]
    async fn test_decide_decided_record_fails_before_the_chain() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&pending_record("MR0001")).unwrap();
        store
            .decide("MR0001", DecideAction::Reject, "admin", None)
            .unwrap();
        let usecase = DecideUseCase::new(Box::new(store));

        // Verify on a rejected record must fail without ever submitting,
        // so the dead gateway is never contacted.
        let client = hyper::Client::new();
        let result = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001", DecideAction::Verify, "admin")
            .await;

        assert!(matches!(result, Err(DecideError::AlreadyDecided)));
    }

    #[tokio::test]
    async fn test_decide_with_blank_decider_fails() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&pending_record("MR0001")).unwrap();
        let usecase = DecideUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let result = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001", DecideAction::Reject, " ")
            .await;

        assert!(matches!(result, Err(DecideError::MissingDecider)));
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_record_pending() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&pending_record("MR0001")).unwrap();
        let usecase = DecideUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let result = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001", DecideAction::Verify, "admin")
            .await;

        assert!(matches!(result, Err(DecideError::Chain(_))));
    }
}

#[cfg(test)]
mod verify_tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_unknown_id_is_not_found() {
        let store = SqliteStore::in_memory().unwrap();
        let usecase = VerifyUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let result = usecase.execute(&client, DEAD_GATEWAY, "missing").await;

        assert!(matches!(result, Err(VerifyError::NotFound)));
    }

    #[tokio::test]
    async fn test_unattested_record_skips_the_chain() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&pending_record("MR0001")).unwrap();
        let usecase = VerifyUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let report = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001")
            .await
            .unwrap();

        assert_eq!(report.record.status, RecordStatus::Pending);
        assert_eq!(report.on_chain, None);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_reports_unknown_not_absent() {
        let store = SqliteStore::in_memory().unwrap();
        let mut record = pending_record("MR0001");
        record.status = RecordStatus::Verified;
        record.attestation_id = Some("0xtx1".to_string());
        record.decided_at = Some(1000);
        record.decided_by = Some("admin".to_string());
        store.create(&record).unwrap();
        let usecase = VerifyUseCase::new(Box::new(store));

        let client = hyper::Client::new();
        let report = usecase
            .execute(&client, DEAD_GATEWAY, "MR0001")
            .await
            .unwrap();

        // The stored status is reported untouched; the failed check is
        // "unknown", never a definitive "absent".
        assert_eq!(report.record.status, RecordStatus::Verified);
        assert_eq!(
            report.on_chain,
            Some(medledger::application::OnChainCheck::Unknown)
        );
    }
}
