use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, Uri, header, request::Parts},
};
use serde::Deserialize;
use tracing::warn;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the bearer token for a request: the `token` query parameter wins,
/// then the credential half of an `Authorization: <scheme> <credential>`
/// header. `None` means the request carried no token at all.
pub fn extract_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let from_query = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty());

    if from_query.is_some() {
        return from_query;
    }

    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let _scheme = parts.next()?;
    let credential = parts.next()?;

    if parts.next().is_some() {
        return None;
    }
    Some(credential.to_string())
}

/// Extractor for routes that require a signed-in user. Yields the user id
/// carried by a valid token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub u32);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = extract_token(&parts.uri, &parts.headers).ok_or(ApiError::Unauthenticated)?;

        state.tokens.verify(&token).map(AuthUser).map_err(|e| {
            warn!("Rejected token on {}: {}", parts.uri.path(), e);
            ApiError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn query_parameter() {
        let uri: Uri = "/posts?token=abc.def.ghi".parse().unwrap();
        assert_eq!(extract_token(&uri, &HeaderMap::new()).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn query_wins_over_header() {
        let uri: Uri = "/posts?token=from-query".parse().unwrap();
        let got = extract_token(&uri, &headers("Bearer from-header"));
        assert_eq!(got.as_deref(), Some("from-query"));
    }

    #[test]
    fn bearer_header() {
        let uri: Uri = "/posts".parse().unwrap();
        assert_eq!(extract_token(&uri, &headers("Bearer xyz")).as_deref(), Some("xyz"));
        assert_eq!(extract_token(&uri, &headers("Bearer   xyz  ")).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_query_falls_back_to_header() {
        let uri: Uri = "/posts?token=".parse().unwrap();
        assert_eq!(extract_token(&uri, &headers("Bearer xyz")).as_deref(), Some("xyz"));
    }

    #[test]
    fn absent_or_unusable() {
        let uri: Uri = "/posts?other=1".parse().unwrap();
        assert_eq!(extract_token(&uri, &HeaderMap::new()), None);
        assert_eq!(extract_token(&uri, &headers("xyz")), None);
        assert_eq!(extract_token(&uri, &headers("Bearer a b")), None);
    }
}
