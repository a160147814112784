//! HTTP client tests against an in-process fake signing service

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use officeflow_queue::{QueueConfig, RequestQueue};
use officeflow_signing::request::{SignPayload, SignResponse};
use officeflow_signing::{
    HttpSignatureService, QueuedSigner, SignRequest, SignatureService, SigningConfig,
    SigningError,
};

#[derive(Clone, Default)]
struct FakeService {
    calls: Arc<AtomicU32>,
    /// Respond 503 this many times before succeeding
    outages: Arc<AtomicU32>,
    token: Option<&'static str>,
}

async fn sign_handler(
    State(fake): State<FakeService>,
    headers: HeaderMap,
    Json(payload): Json<SignPayload>,
) -> Result<Json<SignResponse>, (StatusCode, String)> {
    fake.calls.fetch_add(1, Ordering::SeqCst);

    if let Some(token) = fake.token {
        let expected = format!("Bearer {token}");
        let given = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            return Err((StatusCode::UNAUTHORIZED, "bad token".to_string()));
        }
    }

    let outage = fake
        .outages
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if outage {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "busy".to_string()));
    }

    if payload.signer == "blocked" {
        return Err((StatusCode::FORBIDDEN, "signer not allowed".to_string()));
    }

    let mut pdf = STANDARD
        .decode(payload.pdf_base64.as_bytes())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    pdf.extend_from_slice(format!("\n%signed-by {}", payload.signer).as_bytes());

    Ok(Json(SignResponse {
        document_id: payload.document_id,
        signed_pdf_base64: STANDARD.encode(&pdf),
        signed_at: None,
    }))
}

async fn spawn_fake(fake: FakeService) -> String {
    let app = Router::new()
        .route("/sign", post(sign_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn contract(signer: &str) -> SignRequest {
    SignRequest::new("contract-7", b"%PDF-1.7\n%%EOF".to_vec(), signer)
}

fn fast_queue() -> RequestQueue {
    RequestQueue::new(QueueConfig {
        concurrency: 2,
        max_retries: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        ..QueueConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_signs_over_http() {
    let url = spawn_fake(FakeService::default()).await;
    let service = HttpSignatureService::with_url(&url).unwrap();

    assert!(service.is_available().await);

    let signed = service.sign(&contract("Noor")).await.unwrap();
    assert_eq!(signed.document_id, "contract-7");
    assert_eq!(signed.signer, "Noor");
    assert!(signed.pdf.ends_with(b"%signed-by Noor"));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let fake = FakeService {
        token: Some("s3cret"),
        ..FakeService::default()
    };
    let url = spawn_fake(fake).await;

    let anonymous = HttpSignatureService::with_url(&url).unwrap();
    let err = anonymous.sign(&contract("Noor")).await.unwrap_err();
    assert!(matches!(err, SigningError::Rejected { status: 401, .. }));
    assert!(!err.is_transient());

    let authorized = HttpSignatureService::new(SigningConfig {
        base_url: url,
        api_token: Some("s3cret".to_string()),
        ..SigningConfig::default()
    })
    .unwrap();
    assert!(authorized.sign(&contract("Noor")).await.is_ok());
}

#[tokio::test]
async fn test_queued_signer_rides_out_outage() {
    let fake = FakeService::default();
    fake.outages.store(2, Ordering::SeqCst);
    let calls = fake.calls.clone();
    let url = spawn_fake(fake).await;

    let signer = QueuedSigner::new(HttpSignatureService::with_url(&url).unwrap(), fast_queue());
    let signed = signer.sign(&contract("Noor")).await.unwrap();

    assert!(signed.pdf.ends_with(b"%signed-by Noor"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let status = signer.status();
    assert_eq!(status.completed, 1);
    assert_eq!(status.recent[0].attempts, 3);
}

#[tokio::test]
async fn test_queued_signer_does_not_retry_rejections() {
    let fake = FakeService::default();
    let calls = fake.calls.clone();
    let url = spawn_fake(fake).await;

    let signer = QueuedSigner::new(HttpSignatureService::with_url(&url).unwrap(), fast_queue());
    let err = signer.sign(&contract("blocked")).await.unwrap_err();

    assert!(matches!(err, SigningError::Rejected { status: 403, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(signer.status().failed, 1);
}

#[tokio::test]
async fn test_outage_longer_than_retries_fails() {
    let fake = FakeService::default();
    fake.outages.store(10, Ordering::SeqCst);
    let calls = fake.calls.clone();
    let url = spawn_fake(fake).await;

    let signer = QueuedSigner::new(HttpSignatureService::with_url(&url).unwrap(), fast_queue());
    let err = signer.sign(&contract("Noor")).await.unwrap_err();

    assert!(matches!(err, SigningError::Server { status: 503, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
