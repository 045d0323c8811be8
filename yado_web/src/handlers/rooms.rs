use std::ops::Range;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use yado::{
    domain::{
        core::{Hotel, HotelId, Money, Room, RoomId, RoomKind},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::AdminSession,
    pagination::Page,
    state::AppState,
};

#[derive(Deserialize)]
pub struct ListQuery {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u8>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// ホテルの客室一覧
///
/// チェックイン・チェックアウト日を指定すると空室のみ返す。
pub async fn list(
    State(state): State<AppState>,
    Path(hotel_id): Path<u64>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let period = match (params.check_in, params.check_out) {
        (Some(check_in), Some(check_out)) => {
            if check_in >= check_out {
                return Err(ApiError::Validation(
                    "Check-out date must be after check-in date".to_owned(),
                ));
            }
            Some(check_in..check_out)
        }
        (None, None) => None,
        _ => {
            return Err(ApiError::Validation(
                "Both check-in and check-out dates are required".to_owned(),
            ))
        }
    };

    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Room::ENTITY_NAME);
    let filter = format!("hotel_id = {}", hotel_id);
    // 空室判定は文書の絞り込みでは表現できないため、
    // ホテルの全室を引いてから絞り込み、その後にページを切る。
    let mut query = index.search();
    query.with_filter(&filter).with_limit(1000);
    let results = query.execute::<Room>().await?;

    let rooms: Vec<Room> = results.hits.into_iter().map(|hit| hit.result).collect();
    Ok(Json(available(rooms, period.as_ref(), params.guests, &page)))
}

/// 空室・定員で絞り込んでからページを切り出す
fn available(
    mut rooms: Vec<Room>,
    period: Option<&Range<NaiveDate>>,
    guests: Option<u8>,
    page: &Page,
) -> Vec<Room> {
    if let Some(period) = period {
        rooms.retain(|room| room.is_vacant(period));
    }
    if let Some(guests) = guests {
        rooms.retain(|room| room.capacity() >= guests);
    }
    rooms
        .into_iter()
        .skip(page.offset())
        .take(page.limit())
        .collect()
}

/// 客室詳細
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Room>, ApiError> {
    let repository = EventStoreRepository::<Room>::new(state.eventstore.clone());
    let room = repository
        .find(RoomId::from(id))
        .await?
        .ok_or(ApiError::NotFound("room"))?;
    Ok(Json(room))
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub number: String,
    pub kind: RoomKind,
    pub capacity: u8,
    pub price_per_night: Money,
}

/// 客室登録（管理者のみ）
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(hotel_id): Path<u64>,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let hotel_id = HotelId::from(hotel_id);
    let hotels = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    hotels
        .find(hotel_id)
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;

    let id = ID_GENERATOR.generate::<RoomId>().await;
    let mut room = Room::add(
        id,
        hotel_id,
        body.number,
        body.kind,
        body.capacity,
        body.price_per_night,
    )
    .map_err(ApiError::validation)?;
    let mut repository = EventStoreRepository::<Room>::new(state.eventstore.clone());
    repository.store(&mut room).await?;
    info!("客室を登録: room_id={} hotel_id={}", room.id(), hotel_id);
    Ok((StatusCode::CREATED, Json(room)))
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub price_per_night: Money,
}

/// 宿泊料金変更（管理者のみ）
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<Room>, ApiError> {
    let mut repository = EventStoreRepository::<Room>::new(state.eventstore.clone());
    let mut room = repository
        .find(RoomId::from(id))
        .await?
        .ok_or(ApiError::NotFound("room"))?;
    room.change_price(body.price_per_night);
    repository.store(&mut room).await?;
    Ok(Json(room))
}

/// 客室削除（管理者のみ）
pub async fn destroy(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut repository = EventStoreRepository::<Room>::new(state.eventstore.clone());
    let mut room = repository
        .find(RoomId::from(id))
        .await?
        .ok_or(ApiError::NotFound("room"))?;
    if !room.occupancies().is_empty() {
        return Err(ApiError::Conflict(
            "Room still has active occupancies".to_owned(),
        ));
    }
    room.delete();
    repository.store(&mut room).await?;
    repository.remove(&mut room).await?;
    info!("客室を削除: room_id={}", room.id());
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yado::domain::core::{BookingId, Currency, Occupancy};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn room(id: u64, capacity: u8) -> Room {
        Room::add(
            RoomId::from(id),
            HotelId::from(1),
            id.to_string(),
            RoomKind::Twin,
            capacity,
            Money::new(10000, Currency::JPY),
        )
        .unwrap()
    }

    // 満室の部屋を除いてからページを切るので、ページの頭が欠けない
    #[test]
    fn test_available_filters_before_slicing() {
        let mut occupied = room(1, 2);
        occupied
            .add_occupancy(Occupancy {
                booking_id: BookingId::from(9),
                period: date(2024, 4, 1)..date(2024, 4, 5),
            })
            .unwrap();
        let rooms = vec![occupied, room(2, 2), room(3, 2)];
        let period = date(2024, 4, 2)..date(2024, 4, 4);
        let result = available(rooms, Some(&period), None, &Page::new(Some(1), Some(2)));
        let numbers: Vec<&str> = result.iter().map(|room| room.number()).collect();
        assert_eq!(numbers, ["2", "3"]);
    }

    #[test]
    fn test_available_second_page() {
        let rooms = vec![room(1, 2), room(2, 2), room(3, 2)];
        let result = available(rooms, None, None, &Page::new(Some(2), Some(2)));
        let numbers: Vec<&str> = result.iter().map(|room| room.number()).collect();
        assert_eq!(numbers, ["3"]);
    }

    #[test]
    fn test_available_by_capacity() {
        let rooms = vec![room(1, 2), room(2, 4)];
        let result = available(rooms, None, Some(3), &Page::default());
        let numbers: Vec<&str> = result.iter().map(|room| room.number()).collect();
        assert_eq!(numbers, ["2"]);
    }
}
