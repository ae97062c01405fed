//! Federated sign-in credential decoding
//!
//! The identity provider hands the browser a signed JWT. The client only
//! reads the payload segment to prefill name and email; the backend checks
//! the signature when the credential is forwarded.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use crate::api::dto::FederatedLoginRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Credential is not a JWT")]
    Malformed,

    #[error("Credential payload is not valid base64: {0}")]
    Encoding(String),

    #[error("Credential payload is not valid JSON: {0}")]
    Payload(String),

    #[error("Credential has no email")]
    MissingEmail,
}

/// Claims the client reads from the credential
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FederatedIdentity {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl FederatedIdentity {
    /// Decode the payload of `credential` without verifying its signature
    pub fn decode(credential: &str) -> Result<Self, IdentityError> {
        let mut parts = credential.trim().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::Malformed);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::Encoding(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| IdentityError::Payload(e.to_string()))
    }

    /// Body for the backend's federated login endpoint
    pub fn login_request(&self, credential: &str) -> Result<FederatedLoginRequest, IdentityError> {
        let email = self
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        let name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(FederatedLoginRequest {
            credential: credential.to_string(),
            name,
            email,
        })
    }
}
