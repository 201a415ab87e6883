use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use tutorhub_common::AppError;

use crate::jwt::{Claims, JwtService};

/// Validates the bearer token on every request; handlers that take `Claims`
/// are rejected with 401 before they run.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token_from_headers(&parts.headers).ok_or_else(|| {
            AppError::Authentication("Missing or invalid authorization header".to_string())
        })?;

        let jwt_service = JwtService::from_ref(state);
        jwt_service.validate_token(token)
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token_from_headers(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token_from_headers(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token_from_headers(&headers), Some("abc.def.ghi"));
    }
}
