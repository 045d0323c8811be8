use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use yado::{
    domain::{
        core::{Hotel, HotelId, StarRating},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::AdminSession,
    pagination::{quote, Page},
    state::AppState,
};

/// 一覧の並び替えキーと検索インデックスのソート式の対応
fn sort_expression(key: &str) -> Option<&'static str> {
    match key {
        "name_asc" => Some("name:asc"),
        "name_desc" => Some("name:desc"),
        "rating_asc" => Some("star_rating:asc"),
        // おすすめ順は星評価の降順
        "rating_desc" | "recommended" => Some("star_rating:desc"),
        _ => None,
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub city: Option<String>,
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// ホテル一覧・検索
///
/// 休業中のホテルは一覧に出さない。
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Hotel>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Hotel::ENTITY_NAME);

    let mut filters = vec!["closed = false".to_owned()];
    if let Some(city) = &params.city {
        filters.push(format!("city = {}", quote(city)));
    }
    let filter = filters.join(" AND ");

    let sort = match params.sort.as_deref() {
        Some(key) => {
            let expression = sort_expression(key)
                .ok_or_else(|| ApiError::Validation(format!("Unknown sort key: {}", key)))?;
            vec![expression]
        }
        None => Vec::new(),
    };

    let mut query = index.search();
    query
        .with_filter(&filter)
        .with_offset(page.offset())
        .with_limit(page.limit());
    if let Some(q) = &params.q {
        query.with_query(q);
    }
    if !sort.is_empty() {
        query.with_sort(&sort);
    }
    let results = query.execute::<Hotel>().await?;
    Ok(Json(results.hits.into_iter().map(|hit| hit.result).collect()))
}

/// ホテル詳細
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Hotel>, ApiError> {
    let repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let hotel = repository
        .find(HotelId::from(id))
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    Ok(Json(hotel))
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    pub star_rating: u8,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// ホテル登録（管理者のみ）
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Hotel>), ApiError> {
    let star_rating = StarRating::new(body.star_rating).map_err(ApiError::validation)?;
    let id = ID_GENERATOR.generate::<HotelId>().await;
    let mut hotel = Hotel::open(
        id,
        body.name,
        body.description,
        body.address,
        body.city,
        star_rating,
        body.amenities,
    )
    .map_err(ApiError::validation)?;
    let mut repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    repository.store(&mut hotel).await?;
    info!("ホテルを登録: hotel_id={}", hotel.id());
    Ok((StatusCode::CREATED, Json(hotel)))
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub star_rating: Option<u8>,
    pub amenities: Option<Vec<String>>,
}

/// ホテル情報変更（管理者のみ）
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<Hotel>, ApiError> {
    if body.address.is_some() != body.city.is_some() {
        return Err(ApiError::Validation(
            "Address and city must be changed together".to_owned(),
        ));
    }
    let mut repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let mut hotel = repository
        .find(HotelId::from(id))
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    if let Some(name) = body.name {
        hotel.change_name(name).map_err(ApiError::validation)?;
    }
    if let Some(description) = body.description {
        hotel.change_description(description);
    }
    if let (Some(address), Some(city)) = (body.address, body.city) {
        hotel
            .change_address(address, city)
            .map_err(ApiError::validation)?;
    }
    if let Some(star_rating) = body.star_rating {
        hotel.change_star_rating(StarRating::new(star_rating).map_err(ApiError::validation)?);
    }
    if let Some(amenities) = body.amenities {
        hotel.change_amenities(amenities);
    }
    repository.store(&mut hotel).await?;
    Ok(Json(hotel))
}

/// 休業（管理者のみ）
pub async fn close(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Hotel>, ApiError> {
    let mut repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let mut hotel = repository
        .find(HotelId::from(id))
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    hotel.close().map_err(ApiError::validation)?;
    repository.store(&mut hotel).await?;
    info!("ホテルを休業: hotel_id={}", hotel.id());
    Ok(Json(hotel))
}

/// 営業再開（管理者のみ）
pub async fn reopen(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Hotel>, ApiError> {
    let mut repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let mut hotel = repository
        .find(HotelId::from(id))
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    hotel.reopen().map_err(ApiError::validation)?;
    repository.store(&mut hotel).await?;
    info!("ホテルを営業再開: hotel_id={}", hotel.id());
    Ok(Json(hotel))
}

/// ホテル削除（管理者のみ）
///
/// 削除イベントを射影に流してからストリームを消す。
pub async fn destroy(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut repository = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let mut hotel = repository
        .find(HotelId::from(id))
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    hotel.delete();
    repository.store(&mut hotel).await?;
    repository.remove(&mut hotel).await?;
    info!("ホテルを削除: hotel_id={}", hotel.id());
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_expression() {
        assert_eq!(sort_expression("rating_desc"), Some("star_rating:desc"));
        assert_eq!(sort_expression("recommended"), Some("star_rating:desc"));
        assert_eq!(sort_expression("name_asc"), Some("name:asc"));
        assert_eq!(sort_expression("price"), None);
    }
}
