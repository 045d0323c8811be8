use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use yado::domain::core::Role;

use crate::{
    error::ApiError,
    state::{AppState, Session},
};

/// 認証済みセッション
///
/// `Authorization: Bearer <token>` ヘッダからセッションを解決する。
pub struct AuthSession {
    pub token: String,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;
        let session = state
            .sessions
            .find(token)
            .await
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthSession {
            token: token.to_owned(),
            session,
        })
    }
}

/// 管理者のみ通すセッション
pub struct AdminSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthSession::from_request_parts(parts, state).await?;
        match auth.session.role {
            Role::Admin => Ok(AdminSession(auth)),
            Role::Customer => Err(ApiError::Forbidden),
        }
    }
}
