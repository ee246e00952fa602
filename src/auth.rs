//! Caller identification.
//!
//! Login and sessions live in front of this service. Residents arrive
//! already identified through the `X-Resident-Id` header; administrative
//! routes need `Authorization: Bearer <auth.admin_token>`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::{api::error::ApiError, service::AppState};

pub const RESIDENT_HEADER: &str = "x-resident-id";

/// Id of the resident making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidentId(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResidentId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(RESIDENT_HEADER)
            .ok_or(ApiError::Unauthorized)?;
        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Proof that the caller presented the admin token
#[derive(Debug, Clone, Copy)]
pub struct AdminBearer;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminBearer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;
        if tokens_match(token.trim(), &state.cfg.auth.admin_token) {
            Ok(Self)
        } else {
            tracing::warn!("rejected admin request with wrong token");
            Err(ApiError::Forbidden)
        }
    }
}

/// Length leaks, contents do not
fn tokens_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn resident_from(header: Option<&str>) -> Result<ResidentId, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(RESIDENT_HEADER, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ResidentId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_resident_header_parsed() {
        assert_eq!(resident_from(Some("42")).await.unwrap(), ResidentId(42));
        assert!(matches!(resident_from(None).await, Err(ApiError::Unauthorized)));
        assert!(matches!(
            resident_from(Some("abc")).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secreT", "secret"));
        assert!(!tokens_match("secret-longer", "secret"));
        assert!(!tokens_match("", "secret"));
    }
}
