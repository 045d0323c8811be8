use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use tracing::warn;

use yado::{
    domain::{
        core::{Notification, NotificationId, NotificationKind, UserId},
        ID_GENERATOR,
    },
    infrastructure::EventStoreRepository,
};

use crate::state::AppState;

pub mod bookings;
pub mod bookmarks;
pub mod hotels;
pub mod notifications;
pub mod payments;
pub mod reviews;
pub mod rooms;
pub mod sessions;
pub mod users;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sessions",
            post(sessions::login).delete(sessions::logout),
        )
        .route("/users", get(users::list).post(users::register))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/me/password", put(users::change_password))
        .route("/users/:id/role", put(users::change_role))
        .route("/hotels", get(hotels::list).post(hotels::create))
        .route(
            "/hotels/:id",
            get(hotels::show).put(hotels::update).delete(hotels::destroy),
        )
        .route("/hotels/:id/close", post(hotels::close))
        .route("/hotels/:id/reopen", post(hotels::reopen))
        .route("/hotels/:id/rooms", get(rooms::list).post(rooms::create))
        .route(
            "/rooms/:id",
            get(rooms::show).put(rooms::update).delete(rooms::destroy),
        )
        .route(
            "/hotels/:id/reviews",
            get(reviews::list).post(reviews::create),
        )
        .route(
            "/reviews/:id",
            put(reviews::update).delete(reviews::destroy),
        )
        .route(
            "/hotels/:id/bookmark",
            put(bookmarks::add).delete(bookmarks::remove),
        )
        .route("/bookmarks", get(bookmarks::list))
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route(
            "/bookings/:id",
            get(bookings::show).delete(bookings::cancel),
        )
        .route("/bookings/:id/check-in", post(bookings::check_in))
        .route("/bookings/:id/check-out", post(bookings::check_out))
        .route("/payments", post(payments::create))
        .route("/payments/:id", get(payments::show))
        .route("/payments/:id/complete", post(payments::complete))
        .route("/payments/:id/fail", post(payments::fail))
        .route("/payments/:id/retry", post(payments::retry))
        .route("/payments/:id/refund", post(payments::refund))
        .route("/notifications", get(notifications::list))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .with_state(state)
}

/// 利用者に通知を送る
///
/// 通知の失敗は呼び出し元の操作を失敗させない。
pub(crate) async fn notify(
    state: &AppState,
    user_id: UserId,
    kind: NotificationKind,
    body: String,
) {
    let id = ID_GENERATOR.generate::<NotificationId>().await;
    match Notification::send(id, user_id, kind, body, Utc::now()) {
        Ok(mut notification) => {
            let mut repository =
                EventStoreRepository::<Notification>::new(state.eventstore.clone());
            if let Err(e) = repository.store(&mut notification).await {
                warn!("通知の保存に失敗: {}", e);
            }
        }
        Err(e) => warn!("通知の作成に失敗: {}", e),
    }
}
