mod booking;
mod bookmark;
mod hotel;
mod money;
mod notification;
mod payment;
mod review;
mod room;
mod user;

pub use self::booking::*;
pub use self::bookmark::*;
pub use self::hotel::*;
pub use self::money::*;
pub use self::notification::*;
pub use self::payment::*;
pub use self::review::*;
pub use self::room::*;
pub use self::user::*;

/// 全集約のイベントの和
///
/// `$all` ストリームの購読側でストリーム名から振り分ける。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreEvent {
    HotelEvent(HotelEvent),
    RoomEvent(RoomEvent),
    BookingEvent(BookingEvent),
    PaymentEvent(PaymentEvent),
    UserEvent(UserEvent),
    ReviewEvent(ReviewEvent),
    NotificationEvent(NotificationEvent),
    BookmarkEvent(BookmarkEvent),
}
