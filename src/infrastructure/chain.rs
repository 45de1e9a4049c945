use std::time::Duration;

use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::timeout;

/// Gateway calls wait on wallet confirmation and chain inclusion, so they are
/// bounded: a stalled node cannot pin a request forever.
const CHAIN_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Attestation submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Chain gateway unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    attestation_id: String,
}

#[derive(Debug, Deserialize)]
struct ExistsReply {
    exists: bool,
}

fn parse_submit_reply(bytes: &[u8]) -> Result<String, ChainError> {
    let reply: SubmitReply = serde_json::from_slice(bytes)
        .map_err(|e| ChainError::SubmissionFailed(format!("malformed gateway reply: {}", e)))?;
    if reply.attestation_id.trim().is_empty() {
        return Err(ChainError::SubmissionFailed(
            "gateway returned an empty attestation id".to_string(),
        ));
    }
    Ok(reply.attestation_id)
}

fn parse_exists_reply(bytes: &[u8]) -> Result<bool, ChainError> {
    let reply: ExistsReply = serde_json::from_slice(bytes)
        .map_err(|e| ChainError::Unreachable(format!("malformed gateway reply: {}", e)))?;
    Ok(reply.exists)
}

/// Submit a fingerprint for on-chain attestation.
///
/// Every failure mode — connect error, timeout, non-2xx status, malformed
/// reply — surfaces as `SubmissionFailed`. Callers must never substitute a
/// fabricated identifier for a failed submission.
///
/// # Arguments
/// * `client` - Hyper HTTP client
/// * `gateway_url` - Base URL of the chain gateway (e.g., "http://127.0.0.1:8545")
/// * `fingerprint` - Canonical content fingerprint to attest
pub async fn submit_fingerprint(
    client: &Client<HttpConnector>,
    gateway_url: &str,
    fingerprint: &str,
) -> Result<String, ChainError> {
    let body = serde_json::json!({ "fingerprint": fingerprint }).to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{}/attestations", gateway_url))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .map_err(|e| ChainError::SubmissionFailed(e.to_string()))?;

    let response = timeout(CHAIN_CALL_TIMEOUT, client.request(request))
        .await
        .map_err(|_| ChainError::SubmissionFailed("gateway timed out".to_string()))?
        .map_err(|e| ChainError::SubmissionFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ChainError::SubmissionFailed(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let bytes = hyper::body::to_bytes(response)
        .await
        .map_err(|e| ChainError::SubmissionFailed(e.to_string()))?;

    parse_submit_reply(&bytes)
}

/// Ask the gateway whether a fingerprint is present on-chain.
///
/// A definitive `false` and a failed check are different answers: failures
/// surface as `Unreachable` so callers can report "could not check" instead
/// of "absent".
pub async fn fingerprint_exists(
    client: &Client<HttpConnector>,
    gateway_url: &str,
    fingerprint: &str,
) -> Result<bool, ChainError> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("{}/attestations/{}", gateway_url, fingerprint))
        .body(Body::empty())
        .map_err(|e| ChainError::Unreachable(e.to_string()))?;

    let response = timeout(CHAIN_CALL_TIMEOUT, client.request(request))
        .await
        .map_err(|_| ChainError::Unreachable("gateway timed out".to_string()))?
        .map_err(|e| ChainError::Unreachable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ChainError::Unreachable(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let bytes = hyper::body::to_bytes(response)
        .await
        .map_err(|e| ChainError::Unreachable(e.to_string()))?;

    parse_exists_reply(&bytes)
}
