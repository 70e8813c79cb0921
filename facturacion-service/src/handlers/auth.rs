use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::dtos::auth::{
    LoginForm, LoginQuery, MessageResponse, PasswordResetConfirm, PasswordResetRequest,
    SignInRequest, SignInResponse, SignUpRequest, SignUpResponse, UpdatePasswordRequest,
    VerifyRequest,
};
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::UserProfile;
use crate::services::ServiceError;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub next: String,
    pub error: Option<String>,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Only same-site paths are followed after login.
fn landing_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/home".to_string(),
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let response = state.auth.sign_up(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(req): Query<VerifyRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.auth.verify_email(&req.token).await?))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>), AppError> {
    let response = state.auth.sign_in(req).await?;
    let cookie = session_cookie(
        response.token.access_token.clone(),
        state.config.cookie_secure,
    );
    Ok((jar.add(cookie), Json(response)))
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        next: landing_path(query.next.as_deref()),
        error: None,
    }
}

/// Form login for browser pages: sets the session cookie and redirects.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = landing_path(form.next.as_deref());
    let request = SignInRequest {
        email: form.email,
        password: form.password,
    };

    match state.auth.sign_in(request).await {
        Ok(response) => {
            let cookie = session_cookie(response.token.access_token, state.config.cookie_secure);
            Ok((jar.add(cookie), Redirect::to(&next)).into_response())
        }
        Err(e @ (ServiceError::InvalidCredentials | ServiceError::EmailNotVerified)) => {
            let (status, message) = match e {
                ServiceError::EmailNotVerified => (
                    StatusCode::FORBIDDEN,
                    "Debe verificar su correo antes de ingresar",
                ),
                _ => (StatusCode::UNAUTHORIZED, "Correo o contraseña incorrectos"),
            };
            Ok((
                status,
                LoginTemplate {
                    next,
                    error: Some(message.to_string()),
                },
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.auth.request_password_reset(req).await?))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.auth.confirm_password_reset(req).await?))
}

pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.auth.update_password(&user.0, req).await?))
}

pub async fn session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.auth.current_user(&user.0).await?))
}

pub async fn sign_out(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let message = state.auth.sign_out(&user.0);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(message))
}
