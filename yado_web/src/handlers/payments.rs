use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use yado::{
    domain::{
        core::{Booking, BookingId, NotificationKind, Payment, PaymentId, PaymentMethod, Role},
        Entity, ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::{
    error::ApiError,
    extract::{AdminSession, AuthSession},
    handlers::notify,
    state::AppState,
};

#[derive(Deserialize)]
pub struct CreateRequest {
    pub booking_id: u64,
    pub method: PaymentMethod,
}

/// 決済要求
///
/// 金額は予約の合計から取る。クライアントからは受け取らない。
pub async fn create(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let bookings = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    let booking = bookings
        .find(BookingId::from(body.booking_id))
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    authorize(&auth, &booking)?;

    let id = ID_GENERATOR.generate::<PaymentId>().await;
    let mut payment = Payment::request(id, booking.id(), booking.total().clone(), body.method);
    let mut repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    repository.store(&mut payment).await?;
    info!(
        "決済を要求: payment_id={} booking_id={} amount={}",
        payment.id(),
        booking.id(),
        payment.amount()
    );
    Ok((StatusCode::CREATED, Json(payment)))
}

/// 決済詳細（予約の本人と管理者のみ）
pub async fn show(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, ApiError> {
    let repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    let payment = repository
        .find(PaymentId::from(id))
        .await?
        .ok_or(ApiError::NotFound("payment"))?;
    let bookings = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    let booking = bookings
        .find(payment.booking_id())
        .await?
        .ok_or(ApiError::NotFound("booking"))?;
    authorize(&auth, &booking)?;
    Ok(Json(payment))
}

/// 決済完了（管理者のみ）
///
/// 完了した決済は予約を確定させる。
pub async fn complete(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, ApiError> {
    let mut repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    let mut payment = repository
        .find(PaymentId::from(id))
        .await?
        .ok_or(ApiError::NotFound("payment"))?;
    payment.complete().map_err(ApiError::validation)?;
    repository.store(&mut payment).await?;
    info!("決済が完了: payment_id={}", payment.id());

    let mut bookings = EventStoreRepository::<Booking>::new(state.eventstore.clone());
    match bookings.find(payment.booking_id()).await? {
        Some(mut booking) => {
            match booking.confirm() {
                Ok(()) => {
                    bookings.store(&mut booking).await?;
                    notify(
                        &state,
                        booking.user_id(),
                        NotificationKind::BookingConfirmed,
                        format!("ご予約（予約ID: {}）が確定しました。", booking.id()),
                    )
                    .await;
                }
                Err(e) => warn!(
                    "予約を確定できません: booking_id={} {}",
                    booking.id(),
                    e
                ),
            }
            notify(
                &state,
                booking.user_id(),
                NotificationKind::PaymentCompleted,
                format!("お支払い（{}）が完了しました。", payment.amount()),
            )
            .await;
        }
        None => warn!("予約が見つかりません: booking_id={}", payment.booking_id()),
    }
    Ok(Json(payment))
}

/// 決済失敗（管理者のみ）
pub async fn fail(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, ApiError> {
    let mut repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    let mut payment = repository
        .find(PaymentId::from(id))
        .await?
        .ok_or(ApiError::NotFound("payment"))?;
    payment.fail().map_err(ApiError::validation)?;
    repository.store(&mut payment).await?;
    info!("決済が失敗: payment_id={}", payment.id());
    Ok(Json(payment))
}

/// 決済の再試行（管理者のみ）
///
/// 失敗した決済を保留に戻す。
pub async fn retry(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, ApiError> {
    let mut repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    let mut payment = repository
        .find(PaymentId::from(id))
        .await?
        .ok_or(ApiError::NotFound("payment"))?;
    payment.retry().map_err(ApiError::validation)?;
    repository.store(&mut payment).await?;
    info!("決済を再試行: payment_id={}", payment.id());
    Ok(Json(payment))
}

/// 返金（管理者のみ）
pub async fn refund(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Payment>, ApiError> {
    let mut repository = EventStoreRepository::<Payment>::new(state.eventstore.clone());
    let mut payment = repository
        .find(PaymentId::from(id))
        .await?
        .ok_or(ApiError::NotFound("payment"))?;
    payment.refund().map_err(ApiError::validation)?;
    repository.store(&mut payment).await?;
    info!("返金: payment_id={}", payment.id());
    Ok(Json(payment))
}

fn authorize(auth: &AuthSession, booking: &Booking) -> Result<(), ApiError> {
    match auth.session.role {
        Role::Admin => Ok(()),
        Role::Customer if booking.user_id() == auth.session.user_id => Ok(()),
        Role::Customer => Err(ApiError::Forbidden),
    }
}
