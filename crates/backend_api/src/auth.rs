use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use crate::error::{ApiError, Result};

/// Token verification boundary. The hosted auth service that issues tokens
/// is out of scope; this trait is the seam where its client would plug in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a bearer token to a user id. `Ok(None)` means the token is
    /// unknown; `Err` means the provider itself failed.
    async fn verify_token(&self, token: &str) -> anyhow::Result<Option<String>>;
}

/// Token map loaded once at startup from a JSON object
/// (`{"<token>": "<user_id>", ...}`).
pub struct StaticTokenAuth {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuth {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading token file: {}", path.display()))?;
        let tokens: HashMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing token JSON in {}", path.display()))?;
        Ok(Self { tokens })
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn verify_token(&self, token: &str) -> anyhow::Result<Option<String>> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Resolve the caller identity for a request.
///
/// An `x-user-id` override header wins and skips token validation (the
/// caller is assumed to have authenticated already). Otherwise the
/// `Authorization` header is used, with or without the `Bearer ` prefix.
pub async fn authenticate(headers: &HeaderMap, auth: &dyn AuthProvider) -> Result<String> {
    if let Some(user_id) = headers.get("x-user-id").and_then(|v| v.to_str().ok()) {
        if !user_id.is_empty() {
            return Ok(user_id.to_string());
        }
    }

    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    if token.is_empty() {
        return Err(ApiError::MissingToken);
    }

    match auth.verify_token(token).await {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(ApiError::InvalidToken),
        Err(_) => Err(ApiError::InvalidToken),
    }
}
