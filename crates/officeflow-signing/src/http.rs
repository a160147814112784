//! HTTP client for the PDF-signing microservice

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::config::SigningConfig;
use crate::error::SigningError;
use crate::request::{SignPayload, SignRequest, SignResponse, SignedDocument};
use crate::service::SignatureService;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Signature service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpSignatureService {
    config: SigningConfig,
    client: reqwest::Client,
}

impl HttpSignatureService {
    pub fn new(config: SigningConfig) -> Result<Self, SigningError> {
        config
            .validate()
            .map_err(|e| SigningError::Configuration(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SigningError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Service at `base_url` with otherwise default settings
    pub fn with_url(base_url: &str) -> Result<Self, SigningError> {
        Self::new(SigningConfig {
            base_url: base_url.to_string(),
            ..SigningConfig::default()
        })
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl SignatureService for HttpSignatureService {
    fn name(&self) -> &str {
        "http"
    }

    async fn is_available(&self) -> bool {
        let url = self.config.endpoint("health");
        match self.authorize(self.client.get(&url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn sign(&self, request: &SignRequest) -> Result<SignedDocument, SigningError> {
        request.validate()?;
        let start = Instant::now();
        let url = self.config.endpoint("sign");

        let response = self
            .authorize(self.client.post(&url))
            .json(&SignPayload::from(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SigningError::from_status(status.as_u16(), body));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| SigningError::InvalidResponse(e.to_string()))?;
        let signed = body.into_document(&request.signer)?;

        debug!(
            document_id = %signed.document_id,
            bytes = signed.pdf.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Document signed"
        );
        Ok(signed)
    }
}
