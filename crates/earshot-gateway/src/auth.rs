// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handshake authentication for reverse gateway connections.
//!
//! The gateway presents `Authorization: Bearer <secret>` on the WebSocket
//! upgrade request. When no secret is configured the listener is open -- the
//! daemon logs a startup warning instead of failing closed, because a
//! LAN-only deployment without a secret is the common case for this
//! protocol.

use axum::http::HeaderMap;

/// Authentication configuration for the gateway listener.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer secret. `None` disables handshake auth.
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Validate the upgrade request's bearer credential against the configured
/// secret. Always passes when no secret is configured.
pub fn verify_handshake(headers: &HeaderMap, auth: &AuthConfig) -> bool {
    let Some(expected) = &auth.secret else {
        return true;
    };

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_secret_accepts_anything() {
        let auth = AuthConfig { secret: None };
        assert!(verify_handshake(&HeaderMap::new(), &auth));
        assert!(verify_handshake(&headers_with("Bearer whatever"), &auth));
    }

    #[test]
    fn matching_bearer_accepted() {
        let auth = AuthConfig {
            secret: Some("s3cret".into()),
        };
        assert!(verify_handshake(&headers_with("Bearer s3cret"), &auth));
    }

    #[test]
    fn wrong_or_missing_bearer_rejected() {
        let auth = AuthConfig {
            secret: Some("s3cret".into()),
        };
        assert!(!verify_handshake(&HeaderMap::new(), &auth));
        assert!(!verify_handshake(&headers_with("Bearer nope"), &auth));
        assert!(!verify_handshake(&headers_with("s3cret"), &auth));
        assert!(!verify_handshake(&headers_with("Basic s3cret"), &auth));
    }

    #[test]
    fn debug_redacts_secret() {
        let auth = AuthConfig {
            secret: Some("s3cret".into()),
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("[redacted]"));
    }
}
