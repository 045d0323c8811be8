use async_trait::async_trait;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

/// ホテルリポジトリ
#[async_trait]
pub trait HotelRepository {
    /// IDでホテルを検索する
    async fn find_by_id(&self, id: HotelId) -> Result<Option<Hotel>, DataAccessError>;
    /// ホテルを保存する
    async fn save(&mut self, entity: &mut Hotel) -> Result<bool, DataAccessError>;
    /// ホテルを削除する
    async fn delete(&mut self, entity: &mut Hotel) -> Result<bool, DataAccessError>;
}

/// ホテルID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct HotelId(u64);

impl Id for HotelId {
    type Inner = u64;
}

/// ホテルイベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotelEvent {
    /// ホテルが開業した
    HotelOpened {
        id: HotelId,
        name: String,
        description: String,
        address: String,
        city: String,
        star_rating: StarRating,
        amenities: Vec<String>,
    },
    /// 名前が変更された
    NameChanged { id: HotelId, name: String },
    /// 説明が変更された
    DescriptionChanged { id: HotelId, description: String },
    /// 住所が変更された
    AddressChanged {
        id: HotelId,
        address: String,
        city: String,
    },
    /// 星評価が変更された
    StarRatingChanged { id: HotelId, star_rating: StarRating },
    /// 設備一覧が変更された
    AmenitiesChanged { id: HotelId, amenities: Vec<String> },
    /// 休業した
    HotelClosed { id: HotelId },
    /// 営業を再開した
    HotelReopened { id: HotelId },
    /// ホテルが削除された
    HotelDeleted { id: HotelId },
}

impl Event for HotelEvent {
    type Id = HotelId;

    fn is_creation(&self) -> bool {
        matches!(self, HotelEvent::HotelOpened { .. })
    }
}

/// ホテルエンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Hotel {
    id: HotelId,
    name: String,
    description: String,
    address: String,
    city: String,
    star_rating: StarRating,
    amenities: Vec<String>,
    closed: bool,
    #[serde(skip)]
    events: EventQueue<HotelEvent>,
}

impl Hotel {
    pub fn open(
        id: HotelId,
        name: String,
        description: String,
        address: String,
        city: String,
        star_rating: StarRating,
        amenities: Vec<String>,
    ) -> Result<Self, HotelError> {
        Self::validate_opened(&name, &address, &city)?;
        let mut entity = Hotel {
            id,
            name: name.clone(),
            description: description.clone(),
            address: address.clone(),
            city: city.clone(),
            star_rating,
            amenities: amenities.clone(),
            ..Default::default()
        };
        entity.events.push(HotelEvent::HotelOpened {
            id,
            name,
            description,
            address,
            city,
            star_rating,
            amenities,
        });
        Ok(entity)
    }

    pub fn change_name(&mut self, name: String) -> Result<(), HotelError> {
        Self::validate_name(&name)?;
        self.name = name.clone();
        self.events.push(HotelEvent::NameChanged { id: self.id, name });
        Ok(())
    }

    pub fn change_description(&mut self, description: String) {
        self.description = description.clone();
        self.events.push(HotelEvent::DescriptionChanged {
            id: self.id,
            description,
        });
    }

    pub fn change_address(&mut self, address: String, city: String) -> Result<(), HotelError> {
        Self::validate_address(&address, &city)?;
        self.address = address.clone();
        self.city = city.clone();
        self.events.push(HotelEvent::AddressChanged {
            id: self.id,
            address,
            city,
        });
        Ok(())
    }

    pub fn change_star_rating(&mut self, star_rating: StarRating) {
        self.star_rating = star_rating;
        self.events.push(HotelEvent::StarRatingChanged {
            id: self.id,
            star_rating,
        });
    }

    pub fn change_amenities(&mut self, amenities: Vec<String>) {
        self.amenities = amenities.clone();
        self.events.push(HotelEvent::AmenitiesChanged {
            id: self.id,
            amenities,
        });
    }

    pub fn close(&mut self) -> Result<(), HotelError> {
        self.validate_closed()?;
        self.closed = true;
        self.events.push(HotelEvent::HotelClosed { id: self.id });
        Ok(())
    }

    pub fn reopen(&mut self) -> Result<(), HotelError> {
        self.validate_reopened()?;
        self.closed = false;
        self.events.push(HotelEvent::HotelReopened { id: self.id });
        Ok(())
    }

    pub fn delete(&mut self) {
        self.events.push(HotelEvent::HotelDeleted { id: self.id });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn star_rating(&self) -> StarRating {
        self.star_rating
    }

    pub fn amenities(&self) -> &[String] {
        &self.amenities
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn validate_id(&self, id: &HotelId) -> Result<(), HotelError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(HotelError::MismatchedId),
        }
    }

    fn validate_opened(name: &str, address: &str, city: &str) -> Result<(), HotelError> {
        Self::validate_name(name)?;
        Self::validate_address(address, city)
    }

    fn validate_name(name: &str) -> Result<(), HotelError> {
        match name.trim().is_empty() {
            true => Err(HotelError::NameIsBlank),
            false => Ok(()),
        }
    }

    fn validate_address(address: &str, city: &str) -> Result<(), HotelError> {
        match address.trim().is_empty() || city.trim().is_empty() {
            true => Err(HotelError::AddressIsBlank),
            false => Ok(()),
        }
    }

    fn validate_closed(&self) -> Result<(), HotelError> {
        match self.closed {
            true => Err(HotelError::AlreadyClosed),
            false => Ok(()),
        }
    }

    fn validate_reopened(&self) -> Result<(), HotelError> {
        match self.closed {
            true => Ok(()),
            false => Err(HotelError::NotClosed),
        }
    }
}

impl Entity for Hotel {
    type Id = HotelId;

    const ENTITY_NAME: &'static str = "hotel";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Hotel {
    type Event = HotelEvent;
    type Error = HotelError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            HotelEvent::HotelOpened {
                name,
                address,
                city,
                ..
            } => Self::validate_opened(name, address, city),
            HotelEvent::NameChanged { id, name } => {
                self.validate_id(id)?;
                Self::validate_name(name)
            }
            HotelEvent::AddressChanged { id, address, city } => {
                self.validate_id(id)?;
                Self::validate_address(address, city)
            }
            HotelEvent::HotelClosed { id } => {
                self.validate_id(id)?;
                self.validate_closed()
            }
            HotelEvent::HotelReopened { id } => {
                self.validate_id(id)?;
                self.validate_reopened()
            }
            HotelEvent::DescriptionChanged { id, .. }
            | HotelEvent::StarRatingChanged { id, .. }
            | HotelEvent::AmenitiesChanged { id, .. }
            | HotelEvent::HotelDeleted { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            HotelEvent::HotelOpened {
                id,
                name,
                description,
                address,
                city,
                star_rating,
                amenities,
            } => {
                if self.id != id {
                    if let Ok(entity) =
                        Self::open(id, name, description, address, city, star_rating, amenities)
                    {
                        *self = entity;
                    }
                }
            }
            HotelEvent::NameChanged { id, name } => {
                if self.id == id {
                    if let Err(_e) = self.change_name(name) {}
                }
            }
            HotelEvent::DescriptionChanged { id, description } => {
                if self.id == id {
                    self.change_description(description);
                }
            }
            HotelEvent::AddressChanged { id, address, city } => {
                if self.id == id {
                    if let Err(_e) = self.change_address(address, city) {}
                }
            }
            HotelEvent::StarRatingChanged { id, star_rating } => {
                if self.id == id {
                    self.change_star_rating(star_rating);
                }
            }
            HotelEvent::AmenitiesChanged { id, amenities } => {
                if self.id == id {
                    self.change_amenities(amenities);
                }
            }
            HotelEvent::HotelClosed { id } => {
                if self.id == id {
                    if let Err(_e) = self.close() {}
                }
            }
            HotelEvent::HotelReopened { id } => {
                if self.id == id {
                    if let Err(_e) = self.reopen() {}
                }
            }
            HotelEvent::HotelDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Hotel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.address == other.address
            && self.city == other.city
            && self.star_rating == other.star_rating
            && self.amenities == other.amenities
            && self.closed == other.closed
    }
}

impl Eq for Hotel {}

/// ホテルエラー
#[derive(Error, Display, Debug)]
pub enum HotelError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 名前が空欄です
    #[display(fmt = "Name cannot be blank")]
    NameIsBlank,
    /// 住所が空欄です
    #[display(fmt = "Address cannot be blank")]
    AddressIsBlank,
    /// 星評価が範囲外です
    #[display(fmt = "Star rating must be between 1 and 5")]
    StarRatingOutOfRange,
    /// すでに休業中です
    #[display(fmt = "Hotel is already closed")]
    AlreadyClosed,
    /// 休業中ではありません
    #[display(fmt = "Hotel is not closed")]
    NotClosed,
}

/// 星評価（1〜5）
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StarRating(u8);

impl StarRating {
    pub fn new(value: u8) -> Result<Self, HotelError> {
        match (1..=5).contains(&value) {
            true => Ok(Self(value)),
            false => Err(HotelError::StarRatingOutOfRange),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for StarRating {
    fn default() -> Self {
        Self(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel() -> Hotel {
        Hotel::open(
            HotelId(10),
            "旅荘 月見".to_owned(),
            "静かな温泉宿です。".to_owned(),
            "箱根町1-2-3".to_owned(),
            "箱根".to_owned(),
            StarRating::new(4).unwrap(),
            vec!["温泉".to_owned(), "Wi-Fi".to_owned()],
        )
        .unwrap()
    }

    #[test]
    fn test_hotel_open() {
        let hotel = hotel();
        assert_eq!(hotel.id(), HotelId(10));
        assert_eq!(hotel.name(), "旅荘 月見");
        assert_eq!(hotel.star_rating(), StarRating::new(4).unwrap());
        assert!(!hotel.is_closed());
    }

    #[test]
    fn test_hotel_open_blank_name() {
        assert!(Hotel::open(
            HotelId(11),
            " ".to_owned(),
            String::new(),
            "住所".to_owned(),
            "都市".to_owned(),
            StarRating::default(),
            Vec::new(),
        )
        .is_err());
    }

    #[test]
    fn test_star_rating_range() {
        assert!(StarRating::new(0).is_err());
        assert!(StarRating::new(5).is_ok());
        assert!(StarRating::new(6).is_err());
    }

    #[test]
    fn test_hotel_close_reopen() {
        let mut hotel = hotel();
        hotel.close().unwrap();
        assert!(hotel.is_closed());
        assert!(hotel.close().is_err());
        hotel.reopen().unwrap();
        assert!(!hotel.is_closed());
        assert!(hotel.reopen().is_err());
    }

    #[test]
    fn test_hotel_events_queued() {
        let mut hotel = hotel();
        hotel.change_name("旅荘 月見 本館".to_owned()).unwrap();
        let events = hotel.pop_all();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], HotelEvent::HotelOpened { .. }));
        assert!(matches!(events[1], HotelEvent::NameChanged { .. }));
    }
}
