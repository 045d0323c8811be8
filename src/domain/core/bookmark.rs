use async_trait::async_trait;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{HotelId, UserId};

/// ブックマークリポジトリ
#[async_trait]
pub trait BookmarkRepository {
    /// IDでブックマークを検索する
    async fn find_by_id(&self, id: BookmarkId) -> Result<Option<Bookmark>, DataAccessError>;
    /// ブックマークを保存する
    async fn save(&mut self, entity: &mut Bookmark) -> Result<bool, DataAccessError>;
    /// ブックマークを削除する
    async fn delete(&mut self, entity: &mut Bookmark) -> Result<bool, DataAccessError>;
}

/// ブックマークID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct BookmarkId(u64);

impl Id for BookmarkId {
    type Inner = u64;
}

/// ブックマークイベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkEvent {
    /// ブックマークが追加された
    BookmarkAdded {
        id: BookmarkId,
        user_id: UserId,
        hotel_id: HotelId,
    },
    /// ブックマークが外された
    BookmarkRemoved { id: BookmarkId },
}

impl Event for BookmarkEvent {
    type Id = BookmarkId;

    fn is_creation(&self) -> bool {
        matches!(self, BookmarkEvent::BookmarkAdded { .. })
    }
}

/// 利用者からホテルへのお気に入りマーカー
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    id: BookmarkId,
    user_id: UserId,
    hotel_id: HotelId,
    #[serde(skip)]
    events: EventQueue<BookmarkEvent>,
}

impl Bookmark {
    pub fn add(id: BookmarkId, user_id: UserId, hotel_id: HotelId) -> Self {
        let mut entity = Bookmark {
            id,
            user_id,
            hotel_id,
            ..Default::default()
        };
        entity.events.push(BookmarkEvent::BookmarkAdded {
            id,
            user_id,
            hotel_id,
        });
        entity
    }

    pub fn remove(&mut self) {
        self.events
            .push(BookmarkEvent::BookmarkRemoved { id: self.id });
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn hotel_id(&self) -> HotelId {
        self.hotel_id
    }

    fn validate_id(&self, id: &BookmarkId) -> Result<(), BookmarkError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(BookmarkError::MismatchedId),
        }
    }
}

impl Entity for Bookmark {
    type Id = BookmarkId;

    const ENTITY_NAME: &'static str = "bookmark";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Bookmark {
    type Event = BookmarkEvent;
    type Error = BookmarkError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            BookmarkEvent::BookmarkAdded { .. } => Ok(()),
            BookmarkEvent::BookmarkRemoved { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookmarkEvent::BookmarkAdded {
                id,
                user_id,
                hotel_id,
            } => {
                if self.id != id {
                    *self = Self::add(id, user_id, hotel_id);
                }
            }
            BookmarkEvent::BookmarkRemoved { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Bookmark {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.user_id == other.user_id && self.hotel_id == other.hotel_id
    }
}

impl Eq for Bookmark {}

/// ブックマークエラー
#[derive(Error, Display, Debug)]
pub enum BookmarkError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_add() {
        let bookmark = Bookmark::add(BookmarkId(40), UserId::from(5), HotelId::from(10));
        assert_eq!(bookmark.user_id(), UserId::from(5));
        assert_eq!(bookmark.hotel_id(), HotelId::from(10));
        assert!(matches!(
            bookmark.peek(),
            Some(BookmarkEvent::BookmarkAdded { .. })
        ));
    }
}
