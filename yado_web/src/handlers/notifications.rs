use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use yado::{
    domain::{
        core::{Notification, NotificationId},
        Entity,
    },
    infrastructure::EventStoreRepository,
};

use crate::{error::ApiError, extract::AuthSession, pagination::Page, state::AppState};

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// 自分宛の通知一覧（新着順）
pub async fn list(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Notification::ENTITY_NAME);
    let filter = format!("user_id = {}", auth.session.user_id);
    let sort = ["created_at:desc"];
    let mut query = index.search();
    query
        .with_filter(&filter)
        .with_sort(&sort)
        .with_offset(page.offset())
        .with_limit(page.limit());
    let results = query.execute::<Notification>().await?;
    Ok(Json(results.hits.into_iter().map(|hit| hit.result).collect()))
}

/// 既読にする（宛先本人のみ）
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
) -> Result<Json<Notification>, ApiError> {
    let mut repository = EventStoreRepository::<Notification>::new(state.eventstore.clone());
    let mut notification = repository
        .find(NotificationId::from(id))
        .await?
        .ok_or(ApiError::NotFound("notification"))?;
    if notification.user_id() != auth.session.user_id {
        return Err(ApiError::Forbidden);
    }
    notification.mark_read().map_err(ApiError::validation)?;
    repository.store(&mut notification).await?;
    Ok(Json(notification))
}
