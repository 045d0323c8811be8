use std::ops::Range;

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{HotelId, Money, RoomId, UserId};

/// 予約リポジトリ
#[async_trait]
pub trait BookingRepository {
    /// IDで予約を検索する
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, DataAccessError>;
    /// 予約を保存する
    async fn save(&mut self, entity: &mut Booking) -> Result<bool, DataAccessError>;
    /// 予約を削除する
    async fn delete(&mut self, entity: &mut Booking) -> Result<bool, DataAccessError>;
}

/// 予約ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct BookingId(u64);

impl Id for BookingId {
    type Inner = u64;
}

/// 予約イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    /// 予約が作成された
    BookingCreated {
        id: BookingId,
        user_id: UserId,
        hotel_id: HotelId,
        room_id: RoomId,
        period: Range<NaiveDate>,
        guests: u8,
        total: Money,
    },
    /// 宿泊期間が変更された
    PeriodChanged {
        id: BookingId,
        period: Range<NaiveDate>,
        total: Money,
    },
    /// ステータスが変更された
    StatusChanged { id: BookingId, status: BookingStatus },
    /// 予約が削除された
    BookingDeleted { id: BookingId },
}

impl Event for BookingEvent {
    type Id = BookingId;

    fn is_creation(&self) -> bool {
        matches!(self, BookingEvent::BookingCreated { .. })
    }
}

/// 予約エンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,
    user_id: UserId,
    hotel_id: HotelId,
    room_id: RoomId,
    period: Range<NaiveDate>,
    guests: u8,
    total: Money,
    status: BookingStatus,
    #[serde(skip)]
    events: EventQueue<BookingEvent>,
}

impl Booking {
    pub fn create(
        id: BookingId,
        user_id: UserId,
        hotel_id: HotelId,
        room_id: RoomId,
        period: Range<NaiveDate>,
        guests: u8,
        total: Money,
    ) -> Result<Self, BookingError> {
        Self::validate_created(&period, guests)?;
        let mut entity = Booking {
            id,
            user_id,
            hotel_id,
            room_id,
            period: period.clone(),
            guests,
            total: total.clone(),
            ..Default::default()
        };
        entity.events.push(BookingEvent::BookingCreated {
            id,
            user_id,
            hotel_id,
            room_id,
            period,
            guests,
            total,
        });
        Ok(entity)
    }

    pub fn change_period(
        &mut self,
        period: Range<NaiveDate>,
        total: Money,
    ) -> Result<(), BookingError> {
        Self::validate_period(&period)?;
        self.validate_editable()?;
        self.period = period.clone();
        self.total = total.clone();
        self.events.push(BookingEvent::PeriodChanged {
            id: self.id,
            period,
            total,
        });
        Ok(())
    }

    pub fn change_status(&mut self, status: BookingStatus) -> Result<(), BookingError> {
        self.validate_status(&status)?;
        self.status = status;
        self.events.push(BookingEvent::StatusChanged {
            id: self.id,
            status,
        });
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), BookingError> {
        self.change_status(BookingStatus::Confirmed)
    }

    pub fn cancel(&mut self) -> Result<(), BookingError> {
        self.change_status(BookingStatus::Canceled)
    }

    pub fn check_in(&mut self) -> Result<(), BookingError> {
        self.change_status(BookingStatus::CheckedIn)
    }

    pub fn check_out(&mut self) -> Result<(), BookingError> {
        self.change_status(BookingStatus::CheckedOut)
    }

    pub fn delete(&mut self) {
        self.events.push(BookingEvent::BookingDeleted { id: self.id });
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn hotel_id(&self) -> HotelId {
        self.hotel_id
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn period(&self) -> &Range<NaiveDate> {
        &self.period
    }

    pub fn guests(&self) -> u8 {
        self.guests
    }

    pub fn total(&self) -> &Money {
        &self.total
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// 泊数
    pub fn nights(&self) -> u64 {
        (self.period.end - self.period.start).num_days() as u64
    }

    fn validate_id(&self, id: &BookingId) -> Result<(), BookingError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(BookingError::MismatchedId),
        }
    }

    fn validate_created(period: &Range<NaiveDate>, guests: u8) -> Result<(), BookingError> {
        Self::validate_period(period)?;
        Self::validate_guests(guests)
    }

    /// チェックアウト日はチェックイン日より後でなければならない
    fn validate_period(period: &Range<NaiveDate>) -> Result<(), BookingError> {
        match period.start < period.end {
            true => Ok(()),
            false => Err(BookingError::InvalidPeriod),
        }
    }

    fn validate_guests(guests: u8) -> Result<(), BookingError> {
        match guests >= 1 {
            true => Ok(()),
            false => Err(BookingError::InvalidGuests),
        }
    }

    fn validate_editable(&self) -> Result<(), BookingError> {
        match self.status {
            BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
            _ => Err(BookingError::NotEditable),
        }
    }

    fn validate_status(&self, status: &BookingStatus) -> Result<(), BookingError> {
        match (&self.status, status) {
            (BookingStatus::Pending, BookingStatus::Confirmed)
            | (BookingStatus::Pending, BookingStatus::Canceled)
            | (BookingStatus::Confirmed, BookingStatus::CheckedIn)
            | (BookingStatus::Confirmed, BookingStatus::Canceled)
            | (BookingStatus::CheckedIn, BookingStatus::CheckedOut) => Ok(()),
            _ => Err(BookingError::InvalidStatusTransition),
        }
    }
}

impl Entity for Booking {
    type Id = BookingId;

    const ENTITY_NAME: &'static str = "booking";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Booking {
    type Event = BookingEvent;
    type Error = BookingError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            BookingEvent::BookingCreated { period, guests, .. } => {
                Self::validate_created(period, *guests)
            }
            BookingEvent::PeriodChanged { id, period, .. } => {
                self.validate_id(id)?;
                Self::validate_period(period)?;
                self.validate_editable()
            }
            BookingEvent::StatusChanged { id, status } => {
                self.validate_id(id)?;
                self.validate_status(status)
            }
            BookingEvent::BookingDeleted { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookingEvent::BookingCreated {
                id,
                user_id,
                hotel_id,
                room_id,
                period,
                guests,
                total,
            } => {
                if self.id != id {
                    if let Ok(entity) =
                        Self::create(id, user_id, hotel_id, room_id, period, guests, total)
                    {
                        *self = entity;
                    }
                }
            }
            BookingEvent::PeriodChanged { id, period, total } => {
                if self.id == id {
                    if let Err(_e) = self.change_period(period, total) {}
                }
            }
            BookingEvent::StatusChanged { id, status } => {
                if self.id == id {
                    if let Err(_e) = self.change_status(status) {}
                }
            }
            BookingEvent::BookingDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Booking {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.user_id == other.user_id
            && self.hotel_id == other.hotel_id
            && self.room_id == other.room_id
            && self.period == other.period
            && self.guests == other.guests
            && self.total == other.total
            && self.status == other.status
    }
}

impl Eq for Booking {}

/// 予約エラー
#[derive(Error, Display, Debug)]
pub enum BookingError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// 宿泊期間が不正です
    #[display(fmt = "Check-out date must be after check-in date")]
    InvalidPeriod,
    /// 宿泊人数が不正です
    #[display(fmt = "Guest count must be at least 1")]
    InvalidGuests,
    /// この状態では変更できません
    #[display(fmt = "Booking can no longer be edited")]
    NotEditable,
    /// ステータス遷移が不正です
    #[display(fmt = "Invalid status transition")]
    InvalidStatusTransition,
}

/// 予約ステータス
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// 決済待ち
    Pending,
    /// 確定
    Confirmed,
    /// チェックイン済み
    CheckedIn,
    /// チェックアウト済み
    CheckedOut,
    /// キャンセル
    Canceled,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::core::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn booking() -> Booking {
        Booking::create(
            BookingId(77),
            UserId::from(5),
            HotelId::from(10),
            RoomId::from(201),
            date(2024, 4, 1)..date(2024, 4, 4),
            2,
            Money::new(45000, Currency::JPY),
        )
        .unwrap()
    }

    #[test]
    fn test_booking_create() {
        let booking = booking();
        assert_eq!(booking.id(), BookingId(77));
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.nights(), 3);
    }

    #[test]
    fn test_checkout_must_follow_checkin() {
        // 同日・逆転はどちらも不正
        for period in [
            date(2024, 4, 1)..date(2024, 4, 1),
            date(2024, 4, 4)..date(2024, 4, 1),
        ] {
            let result = Booking::create(
                BookingId(1),
                UserId::from(5),
                HotelId::from(10),
                RoomId::from(201),
                period,
                1,
                Money::default(),
            );
            assert!(matches!(result, Err(BookingError::InvalidPeriod)));
        }
    }

    #[test]
    fn test_zero_guests_rejected() {
        let result = Booking::create(
            BookingId(2),
            UserId::from(5),
            HotelId::from(10),
            RoomId::from(201),
            date(2024, 4, 1)..date(2024, 4, 2),
            0,
            Money::default(),
        );
        assert!(matches!(result, Err(BookingError::InvalidGuests)));
    }

    #[test]
    fn test_status_transitions() {
        let mut booking = booking();
        assert!(booking.check_in().is_err());
        booking.confirm().unwrap();
        booking.check_in().unwrap();
        assert!(booking.cancel().is_err());
        booking.check_out().unwrap();
        assert_eq!(booking.status(), BookingStatus::CheckedOut);
    }

    #[test]
    fn test_cancel_from_pending_and_confirmed() {
        let mut booking = booking();
        booking.cancel().unwrap();
        assert_eq!(booking.status(), BookingStatus::Canceled);
        assert!(booking.confirm().is_err());

        let mut booking = self::booking();
        booking.confirm().unwrap();
        booking.cancel().unwrap();
        assert_eq!(booking.status(), BookingStatus::Canceled);
    }

    #[test]
    fn test_period_not_editable_after_checkin() {
        let mut booking = booking();
        booking.confirm().unwrap();
        booking.check_in().unwrap();
        let result = booking.change_period(
            date(2024, 4, 1)..date(2024, 4, 5),
            Money::new(60000, Currency::JPY),
        );
        assert!(matches!(result, Err(BookingError::NotEditable)));
    }
}
