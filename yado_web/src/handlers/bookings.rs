use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use yado::{
    domain::{
        core::{Booking, BookingId, Hotel, NotificationKind, Occupancy, Role, Room, RoomId},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::{AdminSession, AuthSession},
    handlers::notify,
    pagination::Page,
    state::AppState,
};

#[derive(Deserialize)]
pub struct CreateRequest {
    pub room_id: u64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u8,
}

/// 予約作成
///
/// 客室の占有と予約を同時に保存する。占有の重複は409で返す。
pub async fn create(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let mut rooms = EventStoreRepository::<Room>::new(state.eventstore.clone());
    let mut room = rooms
        .find(RoomId::from(body.room_id))
        .await?
        .ok_or(ApiError::NotFound("room"))?;

    let hotels = EventStoreRepository::<Hotel>::new(state.eventstore.clone());
    let hotel = hotels
        .find(room.hotel_id())
        .await?
        .ok_or(ApiError::NotFound("hotel"))?;
    if hotel.is_closed() {
        return Err(ApiError::Conflict("Hotel is closed".to_owned()));
    }
    if body.guests > room.capacity() {
        return Err(ApiError::Validation(
            "Guest count exceeds room capacity".to_owned(),
        ));
    }

    let period = body.check_in..body.check_out;
    let nights = (body.check_out - body.check_in).num_days().max(0) as u64;
    let total = room
        .price_per_night()
        .times(nights)
        .ok_or_else(|| ApiError::Validation("Total amount is too large".to_owned()))?;

    let id = ID_GENERATOR.generate::<BookingId>().await;
    let mut booking = Booking::create(
        id,
        auth.session.user_id,
        room.hotel_id(),
        room.id(),
        period.clone(),
        body.guests,
        total,
    )
    .map_err(ApiError::validation)?;
    room.add_occupancy(Occupancy {
        booking_id: id,
        period,
    })
    .map_err(|e| ApiError::Conflict(e.to_string()))?;

    let mut bookings = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    bookings.store(&mut booking).await?;
    rooms.store(&mut room).await?;
    info!(
        "予約を作成: booking_id={} room_id={} user_id={}",
        booking.id(),
        room.id(),
        booking.user_id()
    );

    notify(
        &state,
        booking.user_id(),
        NotificationKind::System,
        format!("ご予約を受け付けました（予約ID: {}）。", booking.id()),
    )
    .await;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// 自分の予約一覧（新しい宿泊日順）
pub async fn list(
    State(state): State<AppState>,
    auth: AuthSession,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let page = Page::new(params.page, params.per_page);
    let index = state.meilisearch.index(Booking::ENTITY_NAME);
    let filter = format!("user_id = {}", auth.session.user_id);
    let sort = ["period.start:desc"];
    let mut query = index.search();
    query
        .with_filter(&filter)
        .with_sort(&sort)
        .with_offset(page.offset())
        .with_limit(page.limit());
    let results = query.execute::<Booking>().await?;
    Ok(Json(results.hits.into_iter().map(|hit| hit.result).collect()))
}

/// 予約詳細（本人と管理者のみ）
pub async fn show(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
) -> Result<Json<Booking>, ApiError> {
    let repository = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    let booking = repository
        .find(BookingId::from(id))
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    authorize(&auth, &booking)?;
    Ok(Json(booking))
}

/// 予約キャンセル（本人と管理者のみ）
///
/// 客室の占有も解放する。
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
) -> Result<Json<Booking>, ApiError> {
    let mut repository = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    let mut booking = repository
        .find(BookingId::from(id))
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    authorize(&auth, &booking)?;
    booking.cancel().map_err(ApiError::validation)?;

    let mut rooms = EventStoreRepository::<Room>::new(state.eventstore.clone());
    match rooms.find(booking.room_id()).await? {
        Some(mut room) => {
            if let Err(e) = room.release_occupancy(booking.id()) {
                warn!("占有の解放に失敗: booking_id={} {}", booking.id(), e);
            } else {
                rooms.store(&mut room).await?;
            }
        }
        None => warn!("客室が見つかりません: room_id={}", booking.room_id()),
    }
    repository.store(&mut booking).await?;
    info!("予約をキャンセル: booking_id={}", booking.id());

    notify(
        &state,
        booking.user_id(),
        NotificationKind::BookingCanceled,
        format!("ご予約（予約ID: {}）をキャンセルしました。", booking.id()),
    )
    .await;
    Ok(Json(booking))
}

/// チェックイン（管理者のみ）
pub async fn check_in(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Booking>, ApiError> {
    change_status(state, id, Booking::check_in).await
}

/// チェックアウト（管理者のみ）
pub async fn check_out(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Booking>, ApiError> {
    change_status(state, id, Booking::check_out).await
}

async fn change_status(
    state: AppState,
    id: u64,
    operation: fn(&mut Booking) -> Result<(), yado::domain::core::BookingError>,
) -> Result<Json<Booking>, ApiError> {
    let mut repository = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    let mut booking = repository
        .find(BookingId::from(id))
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    operation(&mut booking).map_err(ApiError::validation)?;
    repository.store(&mut booking).await?;
    info!(
        "予約ステータスを変更: booking_id={} status={:?}",
        booking.id(),
        booking.status()
    );
    Ok(Json(booking))
}

fn authorize(auth: &AuthSession, booking: &Booking) -> Result<(), ApiError> {
    match auth.session.role {
        Role::Admin => Ok(()),
        Role::Customer if booking.user_id() == auth.session.user_id => Ok(()),
        Role::Customer => Err(ApiError::Forbidden),
    }
}
