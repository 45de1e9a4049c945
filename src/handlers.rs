// This module exposes the HTTP handlers for integration testing
// In production, these are only used from main.rs

use std::convert::Infallible;

use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, Response, StatusCode};
use serde::Serialize;

use crate::application::{
    DecideError, DecideRequest, DecideResponse, DecideUseCase, ErrorBody, FilePayload, RecordList,
    RecordSubmission, SubmitError, SubmitRequest, SubmitResponse, SubmitUseCase, VerifyError,
    VerifyUseCase,
};
use crate::domain::RecordStatus;
use crate::infrastructure::database::{RecordStore, SqliteStore};

// Database path - use persistent DB in production, in-memory for fallback
const DB_PATH: &str = "/var/lib/medledger/medledger.db";

/// Get a store instance
/// In production, uses persistent SQLite database
/// Can be overridden via MEDLEDGER_DB_PATH environment variable (for testing)
/// Falls back to in-memory if persistent fails
pub fn get_store() -> Box<dyn RecordStore> {
    let db_path = std::env::var("MEDLEDGER_DB_PATH").unwrap_or_else(|_| DB_PATH.to_string());
    Box::new(
        SqliteStore::open(&db_path)
            .or_else(|_| SqliteStore::in_memory())
            .expect("Failed to initialize record store"),
    )
}

/// Route one request to its handler.
///
/// The hyper client and the chain gateway URL are threaded through from the
/// server bootstrap so tests can point them at a mock gateway.
pub async fn route(
    client: &Client<HttpConnector>,
    gateway_url: &str,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').collect();

    let response = if parts.method == Method::POST && segments == ["records"] {
        handle_submit(body).await
    } else if parts.method == Method::GET && segments == ["records"] {
        handle_list(parts.uri.query())
    } else if parts.method == Method::GET
        && segments.len() == 3
        && segments[0] == "records"
        && segments[2] == "verify"
    {
        handle_verify(client, gateway_url, segments[1]).await
    } else if parts.method == Method::POST
        && segments.len() == 3
        && segments[0] == "records"
        && segments[2] == "decide"
    {
        handle_decide(client, gateway_url, segments[1], body).await
    } else if parts.method == Method::GET && segments == ["health"] {
        json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
    } else if parts.method == Method::GET && segments == ["stats"] {
        handle_stats()
    } else {
        error_response(StatusCode::NOT_FOUND, "No such route")
    };

    Ok(response)
}

async fn handle_submit(body: Body) -> Response<Body> {
    let bytes = match hyper::body::to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let request: SubmitRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Failed to parse submit request: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
            );
        }
    };

    use base64::Engine;
    let mut files = Vec::with_capacity(request.files.len());
    for upload in &request.files {
        let content = match base64::engine::general_purpose::STANDARD.decode(&upload.content) {
            Ok(content) => content,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Invalid base64 content for '{}': {}", upload.name, e),
                )
            }
        };
        files.push(FilePayload {
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            content,
        });
    }

    let submission = RecordSubmission {
        id: request.id,
        patient_ref: request.patient_ref,
        holder_ref: request.holder_ref,
        files,
        claimed_fingerprint: request.claimed_fingerprint,
        claimed_attestation_id: request.claimed_attestation_id,
    };

    println!(
        "Submitting record {} ({} files)",
        submission.id,
        submission.files.len()
    );

    // Hashing is CPU-bound and the store handle blocks, so the whole submit
    // runs off the request thread: one large upload must not starve the
    // runtime.
    let outcome =
        tokio::task::spawn_blocking(move || SubmitUseCase::new(get_store()).execute(submission))
            .await;

    match outcome {
        Ok(Ok(record)) => {
            println!("Record {} created as {}", record.id, record.status.as_str());
            json_response(
                StatusCode::OK,
                &SubmitResponse {
                    id: record.id.clone(),
                    status: record.status,
                    fingerprint: record.fingerprint.clone(),
                },
            )
        }
        Ok(Err(e)) => {
            eprintln!("Submit failed: {}", e);
            submit_error_response(e)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn handle_decide(
    client: &Client<HttpConnector>,
    gateway_url: &str,
    id: &str,
    body: Body,
) -> Response<Body> {
    let bytes = match hyper::body::to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let request: DecideRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Failed to parse decide request: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
            );
        }
    };

    println!("Deciding record {}: {:?}", id, request.action);

    let usecase = DecideUseCase::new(get_store());
    match usecase
        .execute(client, gateway_url, id, request.action, &request.decided_by)
        .await
    {
        Ok(record) => {
            println!("Record {} decided as {}", id, record.status.as_str());
            json_response(
                StatusCode::OK,
                &DecideResponse {
                    status: record.status,
                    attestation_id: record.attestation_id,
                },
            )
        }
        Err(e) => {
            eprintln!("Decision on record {} failed: {}", id, e);
            decide_error_response(e)
        }
    }
}

async fn handle_verify(
    client: &Client<HttpConnector>,
    gateway_url: &str,
    id: &str,
) -> Response<Body> {
    println!("Verifying record {}", id);

    let usecase = VerifyUseCase::new(get_store());
    match usecase.execute(client, gateway_url, id).await {
        Ok(report) => json_response(StatusCode::OK, &report),
        Err(VerifyError::NotFound) => error_response(StatusCode::NOT_FOUND, "Record not found"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn handle_list(query: Option<&str>) -> Response<Body> {
    // Older clients send the camelCase key.
    let holder_ref = query_param(query, "holder_ref").or_else(|| query_param(query, "holderRef"));
    let holder_ref = match holder_ref {
        Some(holder_ref) if !holder_ref.is_empty() => holder_ref,
        _ => return error_response(StatusCode::BAD_REQUEST, "holder_ref is required"),
    };

    let status = match query_param(query, "status") {
        None => None,
        Some(raw) => match RecordStatus::parse(&raw) {
            Some(status) => Some(status),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "status must be pending, verified or rejected",
                )
            }
        },
    };

    match get_store().list_by_holder(&holder_ref, status) {
        Ok(records) => json_response(StatusCode::OK, &RecordList { records }),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn handle_stats() -> Response<Body> {
    match get_store().count_by_status() {
        Ok(counts) => json_response(StatusCode::OK, &counts),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn submit_error_response(err: SubmitError) -> Response<Body> {
    let status = match &err {
        SubmitError::AlreadyExists(_) => StatusCode::CONFLICT,
        SubmitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &err.to_string())
}

fn decide_error_response(err: DecideError) -> Response<Body> {
    let status = match &err {
        DecideError::NotFound => StatusCode::NOT_FOUND,
        DecideError::AlreadyDecided => StatusCode::CONFLICT,
        DecideError::MissingDecider => StatusCode::BAD_REQUEST,
        DecideError::Chain(_) => StatusCode::BAD_GATEWAY,
        DecideError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(key) {
            return Some(parts.next().unwrap_or("").to_string());
        }
    }
    None
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &ErrorBody::new(message))
}
