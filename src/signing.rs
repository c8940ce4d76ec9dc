//! Outbound request middleware and the digital-signature hook
//!
//! Every request built by the transport passes through a [`MiddlewareChain`]
//! before it is sent. The [`SignatureMiddleware`] hands requests that carry
//! the enforce-signature header to a [`Signer`]; all others pass through.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Request;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, ErrorCode, Result};

/// Header eBay uses to mark calls that must be digitally signed
pub const ENFORCE_SIGNATURE_HEADER: &str = "x-ebay-enforce-signature";

/// Failure reported by a signer
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Unknown key pair: {0}")]
    UnknownKeyPair(String),

    #[error("Signing failed: {0}")]
    Failed(String),
}

/// Computes signature headers for a request
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: Request, key_pair_id: &str) -> std::result::Result<Request, SignerError>;
}

/// One step applied to every outbound request
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Request>;
}

/// Ordered list of middleware
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn RequestMiddleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, layer: Arc<dyn RequestMiddleware>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn push(&mut self, layer: Arc<dyn RequestMiddleware>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run the request through every layer in order
    pub async fn apply(&self, mut request: Request) -> Result<Request> {
        for layer in &self.layers {
            request = layer.handle(request).await?;
        }
        Ok(request)
    }
}

/// Signs requests that carry [`ENFORCE_SIGNATURE_HEADER`]
pub struct SignatureMiddleware {
    signer: Arc<dyn Signer>,
    key_pair_id: Option<String>,
}

impl SignatureMiddleware {
    pub fn new(signer: Arc<dyn Signer>, key_pair_id: Option<String>) -> Self {
        Self { signer, key_pair_id }
    }
}

#[async_trait]
impl RequestMiddleware for SignatureMiddleware {
    async fn handle(&self, request: Request) -> Result<Request> {
        if !request.headers().contains_key(ENFORCE_SIGNATURE_HEADER) {
            return Ok(request);
        }

        let key_pair_id = self.key_pair_id.as_deref().ok_or_else(|| {
            Error::new(ErrorCode::Signer).with_detail("signature required but no key pair configured")
        })?;

        debug!(url = %request.url(), key_pair_id, "Signing request");
        self.signer
            .sign(request, key_pair_id)
            .await
            .map_err(|e| Error::new(ErrorCode::Signer).with_cause(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use reqwest::Method;

    struct HeaderSigner;

    #[async_trait]
    impl Signer for HeaderSigner {
        async fn sign(&self, mut request: Request, key_pair_id: &str) -> std::result::Result<Request, SignerError> {
            if key_pair_id == "bad" {
                return Err(SignerError::UnknownKeyPair(key_pair_id.to_string()));
            }
            request
                .headers_mut()
                .insert("x-ebay-signature-key", HeaderValue::from_static("jwe"));
            Ok(request)
        }
    }

    fn request(enforce: bool) -> Request {
        let mut req = Request::new(Method::POST, "https://api.ebay.com/sell/finances/v1/transaction".parse().unwrap());
        if enforce {
            req.headers_mut()
                .insert(ENFORCE_SIGNATURE_HEADER, HeaderValue::from_static("true"));
        }
        req
    }

    #[tokio::test]
    async fn test_passes_through_without_header() {
        let chain = MiddlewareChain::new().with(Arc::new(SignatureMiddleware::new(Arc::new(HeaderSigner), None)));
        let out = chain.apply(request(false)).await.unwrap();
        assert!(!out.headers().contains_key("x-ebay-signature-key"));
    }

    #[tokio::test]
    async fn test_signs_when_enforced() {
        let chain = MiddlewareChain::new().with(Arc::new(SignatureMiddleware::new(
            Arc::new(HeaderSigner),
            Some("kp-1".to_string()),
        )));
        let out = chain.apply(request(true)).await.unwrap();
        assert!(out.headers().contains_key("x-ebay-signature-key"));
    }

    #[tokio::test]
    async fn test_missing_key_pair_fails() {
        let layer = SignatureMiddleware::new(Arc::new(HeaderSigner), None);
        let err = layer.handle(request(true)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Signer);
    }

    #[tokio::test]
    async fn test_signer_failure_is_wrapped() {
        let layer = SignatureMiddleware::new(Arc::new(HeaderSigner), Some("bad".to_string()));
        let err = layer.handle(request(true)).await.unwrap_err();
        assert_eq!(err.number(), 16001);
        assert!(err.cause_as::<SignerError>().is_some());
    }
}
