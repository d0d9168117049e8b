use crate::server::{
    Result, ServerError, ServerRouter,
    json::Json,
    validate::{REQUIRED, ValidationErrors, require, require_present},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{
    Id,
    auth::{AuthToken, Authentication, TokenKind},
    user::{EmailAddress, UserMarker},
};
use plaza_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(login)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct LoginResponse {
    user_id: Id<UserMarker>,
    access_token: String,
    refresh_token: String,
}

fn validate_login(request: LoginRequest) -> Result<(EmailAddress, String)> {
    let mut errors = ValidationErrors::default();

    let email = require(
        &mut errors,
        "email",
        REQUIRED,
        request.email.map(EmailAddress::new),
    );
    let password = require_present(&mut errors, "password", request.password);

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
        _ => Err(ServerError::Validation(errors)),
    }
}

/// Issues a stored token grant and returns its wire form.
async fn issue_token(
    db: &DbClient,
    user_id: Id<UserMarker>,
    kind: TokenKind,
) -> Result<String> {
    let token = AuthToken::generate_random(user_id);

    let authentication = Authentication {
        user: user_id,
        kind,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after: Some(kind.ttl()),
    };
    db.create_authentication(&authentication).await?;

    Ok(token.as_token_str())
}

/// An unknown email and a wrong password produce the same failure; the
/// user's own deletion state is not consulted here (the bearer-auth path
/// rejects deleted users instead).
async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (email, password) = validate_login(request)?;

    let (user_id, digest) = db
        .fetch_credentials(&email)
        .await?
        .ok_or(ServerError::LoginFailed)?;

    if !digest.verify(&password)? {
        return Err(ServerError::LoginFailed);
    }

    let access_token = issue_token(&db, user_id, TokenKind::Access).await?;
    let refresh_token = issue_token(&db, user_id, TokenKind::Refresh).await?;

    Ok(Json(LoginResponse {
        user_id,
        access_token,
        refresh_token,
    }))
}
