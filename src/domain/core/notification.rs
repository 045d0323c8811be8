use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::UserId;

/// 通知リポジトリ
#[async_trait]
pub trait NotificationRepository {
    /// IDで通知を検索する
    async fn find_by_id(&self, id: NotificationId)
        -> Result<Option<Notification>, DataAccessError>;
    /// 通知を保存する
    async fn save(&mut self, entity: &mut Notification) -> Result<bool, DataAccessError>;
    /// 通知を削除する
    async fn delete(&mut self, entity: &mut Notification) -> Result<bool, DataAccessError>;
}

/// 通知ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct NotificationId(u64);

impl Id for NotificationId {
    type Inner = u64;
}

/// 通知イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    /// 通知が送信された
    NotificationSent {
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        body: String,
        created_at: DateTime<Utc>,
    },
    /// 通知が既読になった
    NotificationRead { id: NotificationId },
}

impl Event for NotificationEvent {
    type Id = NotificationId;

    fn is_creation(&self) -> bool {
        matches!(self, NotificationEvent::NotificationSent { .. })
    }
}

/// 通知エンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    user_id: UserId,
    kind: NotificationKind,
    body: String,
    read: bool,
    created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventQueue<NotificationEvent>,
}

impl Notification {
    pub fn send(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        body: String,
        created_at: DateTime<Utc>,
    ) -> Result<Self, NotificationError> {
        Self::validate_sent(&body)?;
        let mut entity = Notification {
            id,
            user_id,
            kind,
            body: body.clone(),
            created_at: Some(created_at),
            ..Default::default()
        };
        entity.events.push(NotificationEvent::NotificationSent {
            id,
            user_id,
            kind,
            body,
            created_at,
        });
        Ok(entity)
    }

    pub fn mark_read(&mut self) -> Result<(), NotificationError> {
        self.validate_read()?;
        self.read = true;
        self.events
            .push(NotificationEvent::NotificationRead { id: self.id });
        Ok(())
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn validate_id(&self, id: &NotificationId) -> Result<(), NotificationError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(NotificationError::MismatchedId),
        }
    }

    fn validate_sent(body: &str) -> Result<(), NotificationError> {
        match body.trim().is_empty() {
            true => Err(NotificationError::BodyIsBlank),
            false => Ok(()),
        }
    }

    fn validate_read(&self) -> Result<(), NotificationError> {
        match self.read {
            true => Err(NotificationError::AlreadyRead),
            false => Ok(()),
        }
    }
}

impl Entity for Notification {
    type Id = NotificationId;

    const ENTITY_NAME: &'static str = "notification";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Notification {
    type Event = NotificationEvent;
    type Error = NotificationError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            NotificationEvent::NotificationSent { body, .. } => Self::validate_sent(body),
            NotificationEvent::NotificationRead { id } => {
                self.validate_id(id)?;
                self.validate_read()
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            NotificationEvent::NotificationSent {
                id,
                user_id,
                kind,
                body,
                created_at,
            } => {
                if self.id != id {
                    if let Ok(entity) = Self::send(id, user_id, kind, body, created_at) {
                        *self = entity;
                    }
                }
            }
            NotificationEvent::NotificationRead { id } => {
                if self.id == id {
                    if let Err(_e) = self.mark_read() {}
                }
            }
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.user_id == other.user_id
            && self.kind == other.kind
            && self.body == other.body
            && self.read == other.read
            && self.created_at == other.created_at
    }
}

impl Eq for Notification {}

/// 通知エラー
#[derive(Error, Display, Debug)]
pub enum NotificationError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 本文が空欄です
    #[display(fmt = "Body cannot be blank")]
    BodyIsBlank,
    /// すでに既読です
    #[display(fmt = "Notification is already read")]
    AlreadyRead,
}

/// 通知種別
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// 予約確定
    BookingConfirmed,
    /// 予約キャンセル
    BookingCanceled,
    /// 決済完了
    PaymentCompleted,
    /// その他のお知らせ
    System,
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_send_and_read() {
        let mut notification = Notification::send(
            NotificationId(900),
            UserId::from(5),
            NotificationKind::BookingConfirmed,
            "ご予約が確定しました。".to_owned(),
            Utc::now(),
        )
        .unwrap();
        assert!(!notification.is_read());
        notification.mark_read().unwrap();
        assert!(notification.is_read());
        assert!(matches!(
            notification.mark_read(),
            Err(NotificationError::AlreadyRead)
        ));
    }

    #[test]
    fn test_blank_body_rejected() {
        let result = Notification::send(
            NotificationId(901),
            UserId::from(5),
            NotificationKind::System,
            "  ".to_owned(),
            Utc::now(),
        );
        assert!(matches!(result, Err(NotificationError::BodyIsBlank)));
    }
}
