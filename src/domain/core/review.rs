use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{HotelId, UserId};

/// レビューリポジトリ
#[async_trait]
pub trait ReviewRepository {
    /// IDでレビューを検索する
    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>, DataAccessError>;
    /// レビューを保存する
    async fn save(&mut self, entity: &mut Review) -> Result<bool, DataAccessError>;
    /// レビューを削除する
    async fn delete(&mut self, entity: &mut Review) -> Result<bool, DataAccessError>;
}

/// レビューID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct ReviewId(u64);

impl Id for ReviewId {
    type Inner = u64;
}

/// レビューイベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewEvent {
    /// レビューが投稿された
    ReviewPosted {
        id: ReviewId,
        hotel_id: HotelId,
        user_id: UserId,
        rating: Rating,
        comment: String,
        posted_at: DateTime<Utc>,
    },
    /// レビューが編集された
    ReviewEdited {
        id: ReviewId,
        rating: Rating,
        comment: String,
    },
    /// レビューが削除された
    ReviewDeleted { id: ReviewId },
}

impl Event for ReviewEvent {
    type Id = ReviewId;

    fn is_creation(&self) -> bool {
        matches!(self, ReviewEvent::ReviewPosted { .. })
    }
}

/// レビューエンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    hotel_id: HotelId,
    user_id: UserId,
    rating: Rating,
    comment: String,
    posted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventQueue<ReviewEvent>,
}

impl Review {
    pub fn post(
        id: ReviewId,
        hotel_id: HotelId,
        user_id: UserId,
        rating: Rating,
        comment: String,
        posted_at: DateTime<Utc>,
    ) -> Self {
        let mut entity = Review {
            id,
            hotel_id,
            user_id,
            rating,
            comment: comment.clone(),
            posted_at: Some(posted_at),
            ..Default::default()
        };
        entity.events.push(ReviewEvent::ReviewPosted {
            id,
            hotel_id,
            user_id,
            rating,
            comment,
            posted_at,
        });
        entity
    }

    pub fn edit(&mut self, rating: Rating, comment: String) {
        self.rating = rating;
        self.comment = comment.clone();
        self.events.push(ReviewEvent::ReviewEdited {
            id: self.id,
            rating,
            comment,
        });
    }

    pub fn delete(&mut self) {
        self.events.push(ReviewEvent::ReviewDeleted { id: self.id });
    }

    pub fn hotel_id(&self) -> HotelId {
        self.hotel_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    fn validate_id(&self, id: &ReviewId) -> Result<(), ReviewError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(ReviewError::MismatchedId),
        }
    }
}

impl Entity for Review {
    type Id = ReviewId;

    const ENTITY_NAME: &'static str = "review";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Review {
    type Event = ReviewEvent;
    type Error = ReviewError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            ReviewEvent::ReviewPosted { .. } => Ok(()),
            ReviewEvent::ReviewEdited { id, .. } | ReviewEvent::ReviewDeleted { id } => {
                self.validate_id(id)
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ReviewEvent::ReviewPosted {
                id,
                hotel_id,
                user_id,
                rating,
                comment,
                posted_at,
            } => {
                if self.id != id {
                    *self = Self::post(id, hotel_id, user_id, rating, comment, posted_at);
                }
            }
            ReviewEvent::ReviewEdited { id, rating, comment } => {
                if self.id == id {
                    self.edit(rating, comment);
                }
            }
            ReviewEvent::ReviewDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Review {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.hotel_id == other.hotel_id
            && self.user_id == other.user_id
            && self.rating == other.rating
            && self.comment == other.comment
            && self.posted_at == other.posted_at
    }
}

impl Eq for Review {}

/// レビューエラー
#[derive(Error, Display, Debug)]
pub enum ReviewError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 評価が範囲外です
    #[display(fmt = "Rating must be between 1 and 5")]
    RatingOutOfRange,
}

/// 評価（1〜5）
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, ReviewError> {
        match (1..=5).contains(&value) {
            true => Ok(Self(value)),
            false => Err(ReviewError::RatingOutOfRange),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_post() {
        let review = Review::post(
            ReviewId(301),
            HotelId::from(10),
            UserId::from(5),
            Rating::new(5).unwrap(),
            "露天風呂が最高でした。".to_owned(),
            Utc::now(),
        );
        assert_eq!(review.id(), ReviewId(301));
        assert_eq!(review.rating().value(), 5);
    }

    #[test]
    fn test_rating_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn test_review_edit() {
        let mut review = Review::post(
            ReviewId(302),
            HotelId::from(10),
            UserId::from(5),
            Rating::new(4).unwrap(),
            "よかったです。".to_owned(),
            Utc::now(),
        );
        review.edit(Rating::new(2).unwrap(), "再訪したら残念でした。".to_owned());
        assert_eq!(review.rating().value(), 2);
        assert_eq!(review.pop_all().len(), 2);
    }
}
