use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use yado::{
    domain::{
        core::{Hotel, HotelId, Rating, Review, ReviewId, Role, User, UserId},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::AuthSession,
    pagination::Page,
    state::AppState,
};

/// 投稿者名を含むレビュー表現
#[derive(Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub hotel_id: HotelId,
    pub user_id: UserId,
    pub author: String,
    pub rating: Rating,
    pub comment: String,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// レビュー投稿
pub async fn create(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(hotel_id): Path<u64>,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let hotel_id = HotelId::from(hotel_id);
    let hotels = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    hotels
        .find(hotel_id)
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;

    let rating = Rating::new(body.rating).map_err(ApiError::validation)?;
    let id = ID_GENERATOR.generate::<ReviewId>().await;
    let mut review = Review::post(
        id,
        hotel_id,
        auth.session.user_id,
        rating,
        body.comment,
        Utc::now(),
    );
    let mut repository = EventStoreRepository::<Review>::new(state.eventstore.clone());
    repository.store(&mut review).await?;
    info!("レビューを投稿: review_id={} hotel_id={}", review.id(), hotel_id);
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// ホテルのレビュー一覧（新着順）
///
/// 投稿者名はイベントストアから束ねて引く。
pub async fn list(
    State(state): State<AppState>,
    Path(hotel_id): Path<u64>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ReviewView>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Review::ENTITY_NAME);
    let filter = format!("hotel_id = {}", hotel_id);
    let sort = ["posted_at:desc"];
    let mut query = index.search();
    query
        .with_filter(&filter)
        .with_sort(&sort)
        .with_offset(page.offset())
        .with_limit(page.limit());
    let results = query.execute::<Review>().await?;
    let reviews: Vec<Review> = results.hits.into_iter().map(|hit| hit.result).collect();

    let users = EventStoreRepository::<User>::new(state.eventstore.clone());
    let user_ids: Vec<UserId> = reviews
        .iter()
        .map(|review| review.user_id())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let fetched = join_all(user_ids.iter().map(|id| users.find(*id))).await;
    let mut authors = HashMap::new();
    for (id, result) in user_ids.iter().zip(fetched) {
        if let Some(user) = result? {
            authors.insert(*id, user.name().to_owned());
        }
    }

    Ok(Json(
        reviews
            .into_iter()
            .map(|review| ReviewView {
                id: review.id(),
                hotel_id: review.hotel_id(),
                user_id: review.user_id(),
                author: authors
                    .get(&review.user_id())
                    .cloned()
                    .unwrap_or_else(|| "退会した利用者".to_owned()),
                rating: review.rating(),
                comment: review.comment().to_owned(),
                posted_at: review.posted_at(),
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// レビュー編集（投稿者と管理者のみ）
pub async fn update(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<Review>, ApiError> {
    let mut repository = EventStoreRepository::<Review>::new(state.eventstore.clone());
    let mut review = repository
        .find(ReviewId::from(id))
        .await?
        .ok_or(ApiError::NotFound("review"))?;
    authorize(&auth, &review)?;
    let rating = Rating::new(body.rating).map_err(ApiError::validation)?;
    review.edit(rating, body.comment);
    repository.store(&mut review).await?;
    Ok(Json(review))
}

/// レビュー削除（投稿者と管理者のみ）
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut repository = EventStoreRepository::<Review>::new(state.eventstore.clone());
    let mut review = repository
        .find(ReviewId::from(id))
        .await?
        .ok_or(ApiError::NotFound("review"))?;
    authorize(&auth, &review)?;
    review.delete();
    repository.store(&mut review).await?;
    repository.remove(&mut review).await?;
    info!("レビューを削除: review_id={}", review.id());
    Ok(StatusCode::NO_CONTENT)
}

fn authorize(auth: &AuthSession, review: &Review) -> Result<(), ApiError> {
    match auth.session.role {
        Role::Admin => Ok(()),
        Role::Customer if review.user_id() == auth.session.user_id => Ok(()),
        Role::Customer => Err(ApiError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Session;

    fn auth(user_id: u64, role: Role) -> AuthSession {
        AuthSession {
            token: "token".to_owned(),
            session: Session {
                user_id: UserId::from(user_id),
                role,
            },
        }
    }

    fn review() -> Review {
        Review::post(
            ReviewId::from(1),
            HotelId::from(2),
            UserId::from(3),
            Rating::new(4).unwrap(),
            "静かで良い宿でした。".to_owned(),
            Utc::now(),
        )
    }

    #[test]
    fn test_authorize_author() {
        assert!(authorize(&auth(3, Role::Customer), &review()).is_ok());
    }

    #[test]
    fn test_authorize_admin() {
        assert!(authorize(&auth(9, Role::Admin), &review()).is_ok());
    }

    #[test]
    fn test_authorize_rejects_other_customer() {
        assert!(matches!(
            authorize(&auth(9, Role::Customer), &review()),
            Err(ApiError::Forbidden)
        ));
    }
}
