use std::error::Error;

use async_trait::async_trait;
use eventstore::{ClientSettings, Position, StreamPosition, SubscribeToAllOptions};
use meilisearch_sdk::{task_info::TaskInfo, tasks::Task};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn, Level};
use uuid::Uuid;

use yado::{
    domain::{
        core::{
            Booking, BookingEvent, Bookmark, BookmarkEvent, CoreEvent, Hotel, HotelEvent,
            Notification, NotificationEvent, Payment, PaymentEvent, Review, ReviewEvent, Room,
            RoomEvent, User, UserEvent,
        },
        Aggregation, Entity,
    },
    YadoConfig,
};

static VERSION_UID: &str = "eventstore_version";

#[tokio::main]
async fn main() {
    match YadoConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = subscribe(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("アプリケーションエラー: {}", error)
        }
    }
}

/// `$all` 購読の再開位置
#[derive(Serialize, Deserialize)]
struct EventstoreVersion {
    id: u64,
    event_id: Uuid,
    position: Position,
}

async fn subscribe(config: &YadoConfig) -> Result<(), Box<dyn Error>> {
    let settings = config.eventstore.url.parse::<ClientSettings>()?;
    let mut client = Client {
        eventstore: eventstore::Client::new(settings)?,
        meilisearch: meilisearch_sdk::Client::new(
            &config.meilisearch.url,
            &config.meilisearch.api_key,
        ),
        task_info: None,
    };
    prepare_indexes(&client.meilisearch).await?;

    // 保存済みの位置から再開する。初回起動時は先頭から読む。
    let position = match client
        .meilisearch
        .index(VERSION_UID)
        .get_document::<EventstoreVersion>("1")
        .await
    {
        Ok(version) => StreamPosition::Position(version.position),
        Err(_) => {
            info!("再開位置が未保存のため先頭から読み込みます");
            StreamPosition::Start
        }
    };
    let mut sub = client
        .eventstore
        .subscribe_to_all(&SubscribeToAllOptions::default().position(position))
        .await;
    loop {
        match sub.next().await {
            Ok(resolved) => {
                if let Ok(core_event) = CoreEvent::try_from(&resolved) {
                    info!("ドメインイベントを受信: {:?}", core_event);
                    if let Err(e) = client.execute(core_event).await {
                        error!("イベント実行エラー: {}", e);
                        continue;
                    }
                } else {
                    info!("システムイベントを受信: {:?}", resolved);
                }
                let event = resolved.get_original_event();
                if let Err(e) = client
                    .meilisearch
                    .index(VERSION_UID)
                    .add_documents(
                        &[EventstoreVersion {
                            id: 1,
                            event_id: event.id,
                            position: event.position,
                        }],
                        Some("id"),
                    )
                    .await
                {
                    error!("バージョン情報保存失敗: {}", e);
                }
            }
            Err(e) => return Err(Box::new(e)),
        }
    }
}

/// 検索・絞り込み・並び替えに使う属性を各インデックスに設定する
async fn prepare_indexes(
    client: &meilisearch_sdk::Client,
) -> Result<(), meilisearch_sdk::errors::Error> {
    let hotels = client.index(Hotel::ENTITY_NAME);
    hotels.set_filterable_attributes(&["city", "closed"]).await?;
    hotels
        .set_sortable_attributes(&["name", "star_rating"])
        .await?;

    let rooms = client.index(Room::ENTITY_NAME);
    rooms.set_filterable_attributes(&["hotel_id"]).await?;

    let bookings = client.index(Booking::ENTITY_NAME);
    bookings
        .set_filterable_attributes(&["user_id", "hotel_id", "room_id", "status"])
        .await?;
    bookings.set_sortable_attributes(&["period.start"]).await?;

    let users = client.index(User::ENTITY_NAME);
    users.set_filterable_attributes(&["email", "role"]).await?;

    let reviews = client.index(Review::ENTITY_NAME);
    reviews
        .set_filterable_attributes(&["hotel_id", "user_id"])
        .await?;
    reviews.set_sortable_attributes(&["posted_at"]).await?;

    let notifications = client.index(Notification::ENTITY_NAME);
    notifications
        .set_filterable_attributes(&["user_id", "read"])
        .await?;
    notifications
        .set_sortable_attributes(&["created_at"])
        .await?;

    let bookmarks = client.index(Bookmark::ENTITY_NAME);
    bookmarks
        .set_filterable_attributes(&["user_id", "hotel_id"])
        .await?;
    Ok(())
}

#[async_trait]
pub trait Execute<E> {
    type Error: Error;
    async fn execute(&mut self, event: E) -> Result<(), Self::Error>;
}

struct Client {
    eventstore: eventstore::Client,
    meilisearch: meilisearch_sdk::Client,
    task_info: Option<TaskInfo>,
}

impl Client {
    async fn wait_for_completion(&self) -> Result<Option<Task>, meilisearch_sdk::errors::Error> {
        if let Some(task_info) = &self.task_info {
            loop {
                match self.meilisearch.wait_for_task(task_info, None, None).await {
                    Ok(task) => match task {
                        Task::Succeeded { .. } | Task::Failed { .. } => return Ok(Some(task)),
                        _ => continue,
                    },
                    Err(meilisearch_sdk::errors::Error::Timeout) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Execute<CoreEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: CoreEvent) -> Result<(), Self::Error> {
        Ok(match event {
            CoreEvent::HotelEvent(event) => self.execute(event).await?,
            CoreEvent::RoomEvent(event) => self.execute(event).await?,
            CoreEvent::BookingEvent(event) => self.execute(event).await?,
            CoreEvent::PaymentEvent(event) => self.execute(event).await?,
            CoreEvent::UserEvent(event) => self.execute(event).await?,
            CoreEvent::ReviewEvent(event) => self.execute(event).await?,
            CoreEvent::NotificationEvent(event) => self.execute(event).await?,
            CoreEvent::BookmarkEvent(event) => self.execute(event).await?,
        })
    }
}

#[async_trait]
impl Execute<HotelEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: HotelEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Hotel::ENTITY_NAME);
        let task = match event {
            HotelEvent::HotelOpened {
                id,
                name,
                description,
                address,
                city,
                star_rating,
                amenities,
            } => {
                if let Ok(entity) =
                    Hotel::open(id, name, description, address, city, star_rating, amenities)
                {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            HotelEvent::NameChanged { id, name } => {
                index
                    .add_or_update(&[json!({"id": id, "name": name})], Some("id"))
                    .await?
            }
            HotelEvent::DescriptionChanged { id, description } => {
                index
                    .add_or_update(&[json!({"id": id, "description": description})], Some("id"))
                    .await?
            }
            HotelEvent::AddressChanged { id, address, city } => {
                index
                    .add_or_update(
                        &[json!({"id": id, "address": address, "city": city})],
                        Some("id"),
                    )
                    .await?
            }
            HotelEvent::StarRatingChanged { id, star_rating } => {
                index
                    .add_or_update(&[json!({"id": id, "star_rating": star_rating})], Some("id"))
                    .await?
            }
            HotelEvent::AmenitiesChanged { id, amenities } => {
                index
                    .add_or_update(&[json!({"id": id, "amenities": amenities})], Some("id"))
                    .await?
            }
            HotelEvent::HotelClosed { id } => {
                index
                    .add_or_update(&[json!({"id": id, "closed": true})], Some("id"))
                    .await?
            }
            HotelEvent::HotelReopened { id } => {
                index
                    .add_or_update(&[json!({"id": id, "closed": false})], Some("id"))
                    .await?
            }
            HotelEvent::HotelDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<RoomEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: RoomEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Room::ENTITY_NAME);
        let task = match event {
            RoomEvent::RoomAdded {
                id,
                hotel_id,
                number,
                kind,
                capacity,
                price_per_night,
            } => {
                if let Ok(entity) =
                    Room::add(id, hotel_id, number, kind, capacity, price_per_night)
                {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            RoomEvent::PriceChanged {
                id,
                price_per_night,
            } => {
                index
                    .add_or_update(
                        &[json!({"id": id, "price_per_night": price_per_night})],
                        Some("id"),
                    )
                    .await?
            }
            // 占有一覧は現在の文書に適用して丸ごと書き戻す
            RoomEvent::OccupancyAdded { id, .. } | RoomEvent::OccupancyReleased { id, .. } => {
                self.wait_for_completion().await?;
                let mut entity = index.get_document::<Room>(&id.to_string()).await?;
                entity.apply(event);
                index.add_or_update(&[entity], Some("id")).await?
            }
            RoomEvent::RoomDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<BookingEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: BookingEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Booking::ENTITY_NAME);
        let task = match event {
            BookingEvent::BookingCreated {
                id,
                user_id,
                hotel_id,
                room_id,
                period,
                guests,
                total,
            } => {
                if let Ok(entity) =
                    Booking::create(id, user_id, hotel_id, room_id, period, guests, total)
                {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            BookingEvent::PeriodChanged { id, period, total } => {
                index
                    .add_or_update(
                        &[json!({"id": id, "period": period, "total": total})],
                        Some("id"),
                    )
                    .await?
            }
            BookingEvent::StatusChanged { id, status } => {
                index
                    .add_or_update(&[json!({"id": id, "status": status})], Some("id"))
                    .await?
            }
            BookingEvent::BookingDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<PaymentEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: PaymentEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Payment::ENTITY_NAME);
        let task = match event {
            PaymentEvent::PaymentRequested {
                id,
                booking_id,
                amount,
                method,
            } => {
                let entity = Payment::request(id, booking_id, amount, method);
                index.add_documents(&[entity], Some("id")).await?
            }
            PaymentEvent::StatusChanged { id, status } => {
                index
                    .add_or_update(&[json!({"id": id, "status": status})], Some("id"))
                    .await?
            }
            PaymentEvent::PaymentDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<UserEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: UserEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(User::ENTITY_NAME);
        let task = match event {
            UserEvent::UserRegistered {
                id,
                name,
                email,
                phone,
                role,
                password,
            } => {
                if let Ok(entity) = User::register(id, name, email, phone, role, password) {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            UserEvent::ProfileChanged { id, name, phone } => {
                index
                    .add_or_update(&[json!({"id": id, "name": name, "phone": phone})], Some("id"))
                    .await?
            }
            UserEvent::EmailChanged { id, email } => {
                index
                    .add_or_update(&[json!({"id": id, "email": email})], Some("id"))
                    .await?
            }
            UserEvent::RoleChanged { id, role } => {
                index
                    .add_or_update(&[json!({"id": id, "role": role})], Some("id"))
                    .await?
            }
            UserEvent::PasswordChanged { id, password } => {
                index
                    .add_or_update(&[json!({"id": id, "password": password})], Some("id"))
                    .await?
            }
            UserEvent::UserDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<ReviewEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: ReviewEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Review::ENTITY_NAME);
        let task = match event {
            ReviewEvent::ReviewPosted {
                id,
                hotel_id,
                user_id,
                rating,
                comment,
                posted_at,
            } => {
                let entity = Review::post(id, hotel_id, user_id, rating, comment, posted_at);
                index.add_documents(&[entity], Some("id")).await?
            }
            ReviewEvent::ReviewEdited { id, rating, comment } => {
                index
                    .add_or_update(
                        &[json!({"id": id, "rating": rating, "comment": comment})],
                        Some("id"),
                    )
                    .await?
            }
            ReviewEvent::ReviewDeleted { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<NotificationEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: NotificationEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Notification::ENTITY_NAME);
        let task = match event {
            NotificationEvent::NotificationSent {
                id,
                user_id,
                kind,
                body,
                created_at,
            } => {
                if let Ok(entity) = Notification::send(id, user_id, kind, body, created_at) {
                    index.add_documents(&[entity], Some("id")).await?
                } else {
                    warn!("不正なエンティティの登録をスキップしました");
                    return Ok(());
                }
            }
            NotificationEvent::NotificationRead { id } => {
                index
                    .add_or_update(&[json!({"id": id, "read": true})], Some("id"))
                    .await?
            }
        };
        self.task_info = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Execute<BookmarkEvent> for Client {
    type Error = meilisearch_sdk::errors::Error;
    async fn execute(&mut self, event: BookmarkEvent) -> Result<(), Self::Error> {
        let index = self.meilisearch.index(Bookmark::ENTITY_NAME);
        let task = match event {
            BookmarkEvent::BookmarkAdded {
                id,
                user_id,
                hotel_id,
            } => {
                let entity = Bookmark::add(id, user_id, hotel_id);
                index.add_documents(&[entity], Some("id")).await?
            }
            BookmarkEvent::BookmarkRemoved { id } => index.delete_document(id).await?,
        };
        self.task_info = Some(task);
        Ok(())
    }
}
