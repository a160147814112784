//! Sign request and response types

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SigningError;

/// Where the signature image goes, in PDF points from the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// 1-based page number
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            page: 1,
            x: 72.0,
            y: 72.0,
            width: 180.0,
            height: 60.0,
        }
    }
}

/// A PDF to be signed
#[derive(Debug, Clone, PartialEq)]
pub struct SignRequest {
    pub document_id: String,
    pub pdf: Vec<u8>,
    pub signer: String,
    /// PNG of the handwritten signature
    pub signature_image: Option<Vec<u8>>,
    pub placement: Placement,
    pub reason: Option<String>,
}

impl SignRequest {
    pub fn new(document_id: impl Into<String>, pdf: Vec<u8>, signer: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            pdf,
            signer: signer.into(),
            signature_image: None,
            placement: Placement::default(),
            reason: None,
        }
    }

    pub fn with_signature_image(mut self, png: Vec<u8>) -> Self {
        self.signature_image = Some(png);
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Catch requests the service would reject anyway
    pub fn validate(&self) -> Result<(), SigningError> {
        let reject = |message: &str| {
            Err(SigningError::Rejected {
                status: 400,
                message: message.to_string(),
            })
        };
        if self.document_id.trim().is_empty() {
            return reject("document id is empty");
        }
        if self.signer.trim().is_empty() {
            return reject("signer is empty");
        }
        if !self.pdf.starts_with(b"%PDF") {
            return reject("payload is not a PDF");
        }
        if self.placement.page == 0 {
            return reject("pages are numbered from 1");
        }
        if self.placement.width <= 0.0 || self.placement.height <= 0.0 {
            return reject("signature box must have a positive size");
        }
        Ok(())
    }
}

/// A signed PDF returned by the service
#[derive(Debug, Clone, PartialEq)]
pub struct SignedDocument {
    pub document_id: String,
    pub pdf: Vec<u8>,
    pub signer: String,
    pub signed_at: DateTime<Utc>,
}

/// JSON body posted to `/sign`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignPayload {
    pub document_id: String,
    pub pdf_base64: String,
    pub signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_base64: Option<String>,
    pub placement: Placement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&SignRequest> for SignPayload {
    fn from(request: &SignRequest) -> Self {
        Self {
            document_id: request.document_id.clone(),
            pdf_base64: STANDARD.encode(&request.pdf),
            signer: request.signer.clone(),
            signature_base64: request.signature_image.as_ref().map(|png| STANDARD.encode(png)),
            placement: request.placement,
            reason: request.reason.clone(),
        }
    }
}

/// JSON body returned by `/sign`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    pub document_id: String,
    pub signed_pdf_base64: String,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
}

impl SignResponse {
    pub fn into_document(self, signer: &str) -> Result<SignedDocument, SigningError> {
        let pdf = STANDARD
            .decode(self.signed_pdf_base64.as_bytes())
            .map_err(|e| SigningError::InvalidResponse(format!("signed_pdf_base64: {e}")))?;
        Ok(SignedDocument {
            document_id: self.document_id,
            pdf,
            signer: signer.to_string(),
            signed_at: self.signed_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_non_pdf() {
        let request = SignRequest::new("doc", b"hello".to_vec(), "Sam");
        assert!(matches!(
            request.validate(),
            Err(SigningError::Rejected { status: 400, .. })
        ));
    }

    #[test]
    fn test_payload_encodes_base64() {
        let request = SignRequest::new("doc", b"%PDF-1.4".to_vec(), "Sam")
            .with_signature_image(vec![1, 2, 3])
            .with_reason("Approved");
        assert!(request.validate().is_ok());

        let payload = SignPayload::from(&request);
        assert_eq!(payload.pdf_base64, "JVBERi0xLjQ=");
        assert_eq!(payload.signature_base64.as_deref(), Some("AQID"));
    }

    #[test]
    fn test_bad_base64_response() {
        let response = SignResponse {
            document_id: "doc".into(),
            signed_pdf_base64: "***".into(),
            signed_at: None,
        };
        assert!(matches!(
            response.into_document("Sam"),
            Err(SigningError::InvalidResponse(_))
        ));
    }
}
