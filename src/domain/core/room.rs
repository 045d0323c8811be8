use std::ops::Range;

use async_trait::async_trait;
use bio::data_structures::interval_tree::IntervalTree;
use chrono::NaiveDate;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{BookingId, HotelId, Money};

/// 客室リポジトリ
#[async_trait]
pub trait RoomRepository {
    /// IDで客室を検索する
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, DataAccessError>;
    /// 客室を保存する
    async fn save(&mut self, entity: &mut Room) -> Result<bool, DataAccessError>;
    /// 客室を削除する
    async fn delete(&mut self, entity: &mut Room) -> Result<bool, DataAccessError>;
}

/// 客室ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct RoomId(u64);

impl Id for RoomId {
    type Inner = u64;
}

/// 客室イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomEvent {
    /// 客室が追加された
    RoomAdded {
        id: RoomId,
        hotel_id: HotelId,
        number: String,
        kind: RoomKind,
        capacity: u8,
        price_per_night: Money,
    },
    /// 宿泊料金が変更された
    PriceChanged { id: RoomId, price_per_night: Money },
    /// 予約による占有が追加された
    OccupancyAdded { id: RoomId, occupancy: Occupancy },
    /// 占有が解放された
    OccupancyReleased { id: RoomId, booking_id: BookingId },
    /// 客室が削除された
    RoomDeleted { id: RoomId },
}

impl Event for RoomEvent {
    type Id = RoomId;

    fn is_creation(&self) -> bool {
        matches!(self, RoomEvent::RoomAdded { .. })
    }
}

/// 客室エンティティ
///
/// 占有期間は宿泊日の半開区間。チェックアウト日と同日のチェックインは重複しない。
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Room {
    id: RoomId,
    hotel_id: HotelId,
    number: String,
    kind: RoomKind,
    capacity: u8,
    price_per_night: Money,
    occupancies: Vec<Occupancy>,
    #[serde(skip)]
    events: EventQueue<RoomEvent>,
}

impl Room {
    pub fn add(
        id: RoomId,
        hotel_id: HotelId,
        number: String,
        kind: RoomKind,
        capacity: u8,
        price_per_night: Money,
    ) -> Result<Self, RoomError> {
        Self::validate_added(&number, capacity)?;
        let mut entity = Room {
            id,
            hotel_id,
            number: number.clone(),
            kind,
            capacity,
            price_per_night: price_per_night.clone(),
            ..Default::default()
        };
        entity.events.push(RoomEvent::RoomAdded {
            id,
            hotel_id,
            number,
            kind,
            capacity,
            price_per_night,
        });
        Ok(entity)
    }

    pub fn change_price(&mut self, price_per_night: Money) {
        self.price_per_night = price_per_night.clone();
        self.events.push(RoomEvent::PriceChanged {
            id: self.id,
            price_per_night,
        });
    }

    pub fn add_occupancy(&mut self, occupancy: Occupancy) -> Result<(), RoomError> {
        self.validate_occupancy_added(&occupancy)?;
        self.occupancies.push(occupancy.clone());
        self.events.push(RoomEvent::OccupancyAdded {
            id: self.id,
            occupancy,
        });
        Ok(())
    }

    pub fn release_occupancy(&mut self, booking_id: BookingId) -> Result<(), RoomError> {
        self.validate_occupancy_released(&booking_id)?;
        self.occupancies.retain(|o| o.booking_id != booking_id);
        self.events.push(RoomEvent::OccupancyReleased {
            id: self.id,
            booking_id,
        });
        Ok(())
    }

    pub fn delete(&mut self) {
        self.events.push(RoomEvent::RoomDeleted { id: self.id });
    }

    /// 指定期間に空室かどうか
    pub fn is_vacant(&self, period: &Range<NaiveDate>) -> bool {
        self.find_overlap(period).is_none()
    }

    pub fn hotel_id(&self) -> HotelId {
        self.hotel_id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    pub fn price_per_night(&self) -> &Money {
        &self.price_per_night
    }

    pub fn occupancies(&self) -> &[Occupancy] {
        &self.occupancies
    }

    fn find_overlap(&self, period: &Range<NaiveDate>) -> Option<BookingId> {
        IntervalTree::from_iter(self.occupancies.iter().map(|o| (&o.period, o)))
            .find(period)
            .next()
            .map(|entry| entry.data().booking_id)
    }

    fn validate_id(&self, id: &RoomId) -> Result<(), RoomError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(RoomError::MismatchedId),
        }
    }

    fn validate_added(number: &str, capacity: u8) -> Result<(), RoomError> {
        if number.trim().is_empty() {
            return Err(RoomError::NumberIsBlank);
        }
        if capacity < 1 {
            return Err(RoomError::InvalidCapacity);
        }
        Ok(())
    }

    fn validate_occupancy_added(&self, occupancy: &Occupancy) -> Result<(), RoomError> {
        if occupancy.period.start >= occupancy.period.end {
            return Err(RoomError::InvalidPeriod);
        }
        if self
            .occupancies
            .iter()
            .any(|o| o.booking_id == occupancy.booking_id)
        {
            return Err(RoomError::DuplicateOccupancy);
        }
        match self.find_overlap(&occupancy.period) {
            Some(_) => Err(RoomError::OverlappingOccupancy),
            None => Ok(()),
        }
    }

    fn validate_occupancy_released(&self, booking_id: &BookingId) -> Result<(), RoomError> {
        match self.occupancies.iter().any(|o| o.booking_id == *booking_id) {
            true => Ok(()),
            false => Err(RoomError::OccupancyNotFound),
        }
    }
}

impl Entity for Room {
    type Id = RoomId;

    const ENTITY_NAME: &'static str = "room";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Room {
    type Event = RoomEvent;
    type Error = RoomError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            RoomEvent::RoomAdded {
                number, capacity, ..
            } => Self::validate_added(number, *capacity),
            RoomEvent::PriceChanged { id, .. } => self.validate_id(id),
            RoomEvent::OccupancyAdded { id, occupancy } => {
                self.validate_id(id)?;
                self.validate_occupancy_added(occupancy)
            }
            RoomEvent::OccupancyReleased { id, booking_id } => {
                self.validate_id(id)?;
                self.validate_occupancy_released(booking_id)
            }
            RoomEvent::RoomDeleted { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            RoomEvent::RoomAdded {
                id,
                hotel_id,
                number,
                kind,
                capacity,
                price_per_night,
            } => {
                if self.id != id {
                    if let Ok(entity) =
                        Self::add(id, hotel_id, number, kind, capacity, price_per_night)
                    {
                        *self = entity;
                    }
                }
            }
            RoomEvent::PriceChanged {
                id,
                price_per_night,
            } => {
                if self.id == id {
                    self.change_price(price_per_night);
                }
            }
            RoomEvent::OccupancyAdded { id, occupancy } => {
                if self.id == id {
                    if let Err(_e) = self.add_occupancy(occupancy) {}
                }
            }
            RoomEvent::OccupancyReleased { id, booking_id } => {
                if self.id == id {
                    if let Err(_e) = self.release_occupancy(booking_id) {}
                }
            }
            RoomEvent::RoomDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.hotel_id == other.hotel_id
            && self.number == other.number
            && self.kind == other.kind
            && self.capacity == other.capacity
            && self.price_per_night == other.price_per_night
            && self.occupancies == other.occupancies
    }
}

impl Eq for Room {}

/// 客室エラー
#[derive(Error, Display, Debug)]
pub enum RoomError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 部屋番号が空欄です
    #[display(fmt = "Room number cannot be blank")]
    NumberIsBlank,
    /// 定員が不正です
    #[display(fmt = "Capacity must be at least 1")]
    InvalidCapacity,
    /// 期間が不正です
    #[display(fmt = "Invalid stay period")]
    InvalidPeriod,
    /// 同じ予約の占有がすでにあります
    #[display(fmt = "Occupancy for this booking already exists")]
    DuplicateOccupancy,
    /// 既存の占有と期間が重なっています
    #[display(fmt = "Occupancy overlaps with an existing stay")]
    OverlappingOccupancy,
    /// 占有が見つかりません
    #[display(fmt = "Occupancy not found")]
    OccupancyNotFound,
}

/// 客室タイプ
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomKind {
    Single,
    Double,
    Twin,
    Suite,
}

impl Default for RoomKind {
    fn default() -> Self {
        RoomKind::Single
    }
}

/// 予約による客室の占有
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub booking_id: BookingId,
    pub period: Range<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::core::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn room() -> Room {
        Room::add(
            RoomId(201),
            HotelId::from(10),
            "201".to_owned(),
            RoomKind::Twin,
            2,
            Money::new(15000, Currency::JPY),
        )
        .unwrap()
    }

    #[test]
    fn test_room_add() {
        let room = room();
        assert_eq!(room.id(), RoomId(201));
        assert_eq!(room.number(), "201");
        assert_eq!(room.capacity(), 2);
    }

    #[test]
    fn test_room_invalid_capacity() {
        assert!(Room::add(
            RoomId(202),
            HotelId::from(10),
            "202".to_owned(),
            RoomKind::Single,
            0,
            Money::default(),
        )
        .is_err());
    }

    #[test]
    fn test_occupancy_overlap() {
        let mut room = room();
        room.add_occupancy(Occupancy {
            booking_id: BookingId::from(1),
            period: date(2024, 4, 1)..date(2024, 4, 5),
        })
        .unwrap();

        // 期間が重なる占有は追加できない
        let overlapping = room.add_occupancy(Occupancy {
            booking_id: BookingId::from(2),
            period: date(2024, 4, 4)..date(2024, 4, 6),
        });
        assert!(matches!(overlapping, Err(RoomError::OverlappingOccupancy)));

        // チェックアウト日と同日のチェックインは許される
        room.add_occupancy(Occupancy {
            booking_id: BookingId::from(3),
            period: date(2024, 4, 5)..date(2024, 4, 7),
        })
        .unwrap();
    }

    #[test]
    fn test_occupancy_release() {
        let mut room = room();
        let period = date(2024, 5, 1)..date(2024, 5, 3);
        room.add_occupancy(Occupancy {
            booking_id: BookingId::from(9),
            period: period.clone(),
        })
        .unwrap();
        assert!(!room.is_vacant(&period));
        room.release_occupancy(BookingId::from(9)).unwrap();
        assert!(room.is_vacant(&period));
        assert!(room.release_occupancy(BookingId::from(9)).is_err());
    }

    #[test]
    fn test_reversed_period_rejected() {
        let mut room = room();
        let result = room.add_occupancy(Occupancy {
            booking_id: BookingId::from(4),
            period: date(2024, 4, 5)..date(2024, 4, 1),
        });
        assert!(matches!(result, Err(RoomError::InvalidPeriod)));
    }
}
