use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use yado::{
    domain::{
        core::{PasswordDigest, Role, User, UserId},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::{AdminSession, AuthSession},
    pagination::{quote, Page},
    state::AppState,
};

/// パスワードダイジェストを含まない利用者表現
#[derive(Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_owned(),
            email: user.email().to_owned(),
            phone: user.phone().to_owned(),
            role: user.role(),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
}

/// 利用者登録
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    // 読み取りモデル基準での重複チェック
    let index = state.meilisearch.index(User::ENTITY_NAME);
    let filter = format!("email = {}", quote(&body.email));
    let mut query = index.search();
    query.with_filter(&filter).with_limit(1);
    let duplicates = query.execute::<User>().await?;
    if !duplicates.hits.is_empty() {
        return Err(ApiError::Conflict("Email is already registered".to_owned()));
    }

    let salt = Uuid::new_v4().simple().to_string();
    let password = PasswordDigest::new(&body.password, &salt).map_err(ApiError::validation)?;
    let id = ID_GENERATOR.generate::<UserId>().await;
    let mut user = User::register(id, body.name, body.email, body.phone, Role::Customer, password)
        .map_err(ApiError::validation)?;
    let mut repository = EventStoreRepository::<User>::new(state.eventstore.clone());
    repository.store(&mut user).await?;
    info!("利用者を登録: user_id={}", user.id());
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// 自分のプロフィール
pub async fn me(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<UserView>, ApiError> {
    let repository = EventStoreRepository::<User>::new(state.eventstore.clone());
    let user = repository
        .find(auth.session.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(UserView::from(&user)))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
}

/// プロフィール変更
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<UserView>, ApiError> {
    let mut repository = EventStoreRepository::<User>::new(state.eventstore.clone());
    let mut user = repository
        .find(auth.session.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    user.change_profile(body.name, body.phone)
        .map_err(ApiError::validation)?;
    if let Some(email) = body.email {
        if email != user.email() {
            user.change_email(email).map_err(ApiError::validation)?;
        }
    }
    repository.store(&mut user).await?;
    Ok(Json(UserView::from(&user)))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// パスワード変更
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let mut repository = EventStoreRepository::<User>::new(state.eventstore.clone());
    let mut user = repository
        .find(auth.session.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    if !user.password().verify(&body.current_password) {
        return Err(ApiError::Forbidden);
    }
    let salt = Uuid::new_v4().simple().to_string();
    let password =
        PasswordDigest::new(&body.new_password, &salt).map_err(ApiError::validation)?;
    user.change_password(password);
    repository.store(&mut user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// 権限変更（管理者のみ）
pub async fn change_role(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<Json<UserView>, ApiError> {
    let mut repository = EventStoreRepository::<User>::new(state.eventstore.clone());
    let mut user = repository
        .find(UserId::from(id))
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    user.change_role(body.role);
    repository.store(&mut user).await?;
    info!("権限を変更: user_id={} role={:?}", user.id(), user.role());
    Ok(Json(UserView::from(&user)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// 利用者一覧（管理者のみ）
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(User::ENTITY_NAME);
    let mut query = index.search();
    query.with_offset(page.offset()).with_limit(page.limit());
    if let Some(q) = &params.q {
        query.with_query(q);
    }
    let results = query.execute::<User>().await?;
    Ok(Json(
        results
            .hits
            .iter()
            .map(|hit| UserView::from(&hit.result))
            .collect(),
    ))
}
