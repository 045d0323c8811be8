use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use yado::domain::{
    core::{Role, User, UserId},
    Entity,
};

use crate::{error::ApiError, extract::AuthSession, pagination::quote, state::AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ログイン応答
///
/// クライアントは token / role / user_id を保持して以降のリクエストに使う。
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

/// ログイン
///
/// 利用者は検索インデックスからメールアドレスで引く。登録直後は
/// 射影の反映を待つ必要がある。
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let index = state.meilisearch.index(User::ENTITY_NAME);
    let filter = format!("email = {}", quote(&body.email));
    let mut query = index.search();
    query.with_filter(&filter).with_limit(1);
    let results = query.execute::<User>().await?;
    let user = results
        .hits
        .into_iter()
        .next()
        .map(|hit| hit.result)
        .ok_or(ApiError::Unauthorized)?;
    if !user.password().verify(&body.password) {
        return Err(ApiError::Unauthorized);
    }
    let token = state.sessions.open(user.id(), user.role()).await;
    info!("ログイン: user_id={}", user.id());
    Ok(Json(LoginResponse {
        token,
        role: user.role(),
        user_id: user.id(),
    }))
}

/// ログアウト
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<StatusCode, ApiError> {
    state.sessions.close(&auth.token).await;
    info!("ログアウト: user_id={}", auth.session.user_id);
    Ok(StatusCode::NO_CONTENT)
}
