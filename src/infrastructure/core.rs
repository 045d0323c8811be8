mod booking;
mod bookmark;
mod hotel;
mod notification;
mod payment;
mod review;
mod room;
mod user;

use eventstore::ResolvedEvent;

use crate::domain::{
    core::{Booking, Bookmark, CoreEvent, Hotel, Notification, Payment, Review, Room, User},
    Entity,
};

pub use self::booking::*;
pub use self::bookmark::*;
pub use self::hotel::*;
pub use self::notification::*;
pub use self::payment::*;
pub use self::review::*;
pub use self::room::*;
pub use self::user::*;

use super::EventConvertError;

impl TryFrom<&ResolvedEvent> for CoreEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        let prefix = value
            .get_original_stream_id()
            .split('-')
            .next()
            .ok_or(EventConvertError)?;
        match prefix {
            Hotel::ENTITY_NAME => Ok(CoreEvent::HotelEvent(TryFrom::try_from(value)?)),
            Room::ENTITY_NAME => Ok(CoreEvent::RoomEvent(TryFrom::try_from(value)?)),
            Booking::ENTITY_NAME => Ok(CoreEvent::BookingEvent(TryFrom::try_from(value)?)),
            Payment::ENTITY_NAME => Ok(CoreEvent::PaymentEvent(TryFrom::try_from(value)?)),
            User::ENTITY_NAME => Ok(CoreEvent::UserEvent(TryFrom::try_from(value)?)),
            Review::ENTITY_NAME => Ok(CoreEvent::ReviewEvent(TryFrom::try_from(value)?)),
            Notification::ENTITY_NAME => {
                Ok(CoreEvent::NotificationEvent(TryFrom::try_from(value)?))
            }
            Bookmark::ENTITY_NAME => Ok(CoreEvent::BookmarkEvent(TryFrom::try_from(value)?)),
            _ => Err(EventConvertError),
        }
    }
}
