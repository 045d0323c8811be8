use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use yado::{
    domain::{
        core::{Bookmark, BookmarkId, Hotel, HotelId},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{error::ApiError, extract::AuthSession, pagination::Page, state::AppState};

/// ホテル名を含むブックマーク表現
#[derive(Serialize)]
pub struct BookmarkView {
    pub id: BookmarkId,
    pub hotel_id: HotelId,
    pub hotel_name: Option<String>,
}

/// ブックマーク追加
pub async fn add(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(hotel_id): Path<u64>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    let hotel_id = HotelId::from(hotel_id);
    let hotels = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    hotels
        .find(hotel_id)
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;

    // 読み取りモデル基準での重複チェック
    if find_bookmark(&state, auth.session.user_id.to_string(), hotel_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Hotel is already bookmarked".to_owned()));
    }

    let id = ID_GENERATOR.generate::<BookmarkId>().await;
    let mut bookmark = Bookmark::add(id, auth.session.user_id, hotel_id);
    let mut repository = EventStoreRepository::<Bookmark>::new(state.eventstore.clone());
    repository.store(&mut bookmark).await?;
    info!(
        "ブックマークを追加: user_id={} hotel_id={}",
        auth.session.user_id, hotel_id
    );
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// ブックマーク解除
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(hotel_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let found = find_bookmark(&state, auth.session.user_id.to_string(), HotelId::from(hotel_id))
        .await?
        .ok_or(ApiError::NotFound("bookmark"))?;

    let mut repository = EventStoreRepository::<Bookmark>::new(state.eventstore.clone());
    let mut bookmark = repository
        .find(found.id())
        .await?
        .ok_or(ApiError::NotFound("bookmark"))?;
    bookmark.remove();
    repository.store(&mut bookmark).await?;
    repository.remove(&mut bookmark).await?;
    info!(
        "ブックマークを解除: user_id={} hotel_id={}",
        auth.session.user_id, hotel_id
    );
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// 自分のブックマーク一覧
pub async fn list(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<BookmarkView>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Bookmark::ENTITY_NAME);
    let filter = format!("user_id = {}", auth.session.user_id);
    let mut query = index.search();
    query
        .with_filter(&filter)
        .with_offset(page.offset())
        .with_limit(page.limit());
    let results = query.execute::<Bookmark>().await?;
    let bookmarks: Vec<Bookmark> = results.hits.into_iter().map(|hit| hit.result).collect();

    let hotels = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let fetched = join_all(bookmarks.iter().map(|b| hotels.find(b.hotel_id()))).await;
    let mut views = Vec::with_capacity(bookmarks.len());
    for (bookmark, hotel) in bookmarks.iter().zip(fetched) {
        views.push(BookmarkView {
            id: bookmark.id(),
            hotel_id: bookmark.hotel_id(),
            hotel_name: hotel?.map(|h| h.name().to_owned()),
        });
    }
    Ok(Json(views))
}

async fn find_bookmark(
    state: &AppState,
    user_id: String,
    hotel_id: HotelId,
) -> Result<Option<Bookmark>, ApiError> {
    let index = state.meilisearch.index(Bookmark::ENTITY_NAME);
    let filter = format!("user_id = {} AND hotel_id = {}", user_id, hotel_id);
    let mut query = index.search();
    query.with_filter(&filter).with_limit(1);
    let results = query.execute::<Bookmark>().await?;
    Ok(results.hits.into_iter().next().map(|hit| hit.result))
}
