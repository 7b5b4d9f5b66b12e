use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use super::{claims::Viewer, jwt::TokenService};

/// Resolves the viewer of a request from its `Authorization` header.
/// Never rejects: a missing or bad token is an anonymous viewer.
pub struct RequestViewer(pub Viewer);

#[async_trait]
impl<S> FromRequestParts<S> for RequestViewer
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        Ok(RequestViewer(viewer_from_headers(&parts.headers, &tokens)))
    }
}

pub fn viewer_from_headers(headers: &HeaderMap, tokens: &TokenService) -> Viewer {
    match headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(raw) => tokens.verify(raw),
        None => Viewer::Anonymous,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::{claims::Identity, jwt::FixedClock},
        config::JwtConfig,
    };

    fn tokens() -> TokenService {
        let cfg = JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 120,
        };
        TokenService::new(&cfg, Arc::new(FixedClock(datetime!(2024-05-01 09:00 UTC))))
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(viewer_from_headers(&HeaderMap::new(), &tokens()), Viewer::Anonymous);
    }

    #[test]
    fn bearer_header_resolves_identity() {
        let tokens = tokens();
        let who = Identity {
            username: "bob".into(),
            email: "bob@example.com".into(),
            id: Uuid::new_v4(),
        };
        let token = tokens.issue(&who).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(viewer_from_headers(&headers, &tokens), Viewer::Authenticated(who));
    }

    #[test]
    fn tampered_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer eyJhbGciOiJIUzI1NiJ9.e30.bad"),
        );
        assert_eq!(viewer_from_headers(&headers, &tokens()), Viewer::Anonymous);
    }
}
