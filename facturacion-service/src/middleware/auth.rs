use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::services::SessionClaims;
use crate::startup::AppState;

/// Cookie holding the session token for browser pages.
pub const SESSION_COOKIE: &str = "access_token";

/// Bearer token from the Authorization header, else the session cookie.
fn session_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
}

fn authenticate(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> Result<SessionClaims, AppError> {
    let token = session_token(headers, jar).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing session token"))
    })?;

    state.auth.validate_session(&token).map_err(|e| {
        tracing::debug!(error = %e, "Session rejected");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired session"))
    })
}

/// Gate for JSON routes: 401 without a valid session.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, req.headers(), &jar)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Gate for HTML pages: redirect to the login form without a valid session.
pub async fn require_page_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers(), &jar) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(_) => {
            let next_path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/home");
            Redirect::to(&format!("/login?next={}", encode_component(next_path))).into_response()
        }
    }
}

/// Percent-encode a path for use as a query value.
fn encode_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Claims of the session that passed the gate.
pub struct AuthUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<SessionClaims>()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No session")))?;

        Ok(AuthUser(claims.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_path_is_encoded() {
        assert_eq!(encode_component("/invoices/3/print"), "/invoices/3/print");
        assert_eq!(encode_component("/a?b=c&d"), "/a%3Fb%3Dc%26d");
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            SESSION_COOKIE,
            "from-cookie",
        ));

        assert_eq!(session_token(&headers, &jar).as_deref(), Some("abc"));
        assert_eq!(
            session_token(&HeaderMap::new(), &jar).as_deref(),
            Some("from-cookie")
        );
    }
}
