use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Booking, BookingEvent, BookingId, BookingRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによる予約リポジトリ
pub type EventStoreBookingRepository = EventStoreRepository<Booking>;

#[async_trait]
impl BookingRepository for EventStoreRepository<Booking> {
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Booking) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Booking) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<BookingEvent> for EventData {
    fn from(value: BookingEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for BookingEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}

#[cfg(test)]
mod tests {
    use eventstore::{EventData, Position, RecordedEvent, ResolvedEvent};
    use serde_json::json;

    use crate::domain::core::{BookingEvent, BookingStatus};

    #[test]
    fn test_event_data_from() {
        let event = BookingEvent::StatusChanged {
            id: 77.into(),
            status: BookingStatus::Confirmed,
        };
        let expected = EventData::json("StatusChanged", json!({ "status": "Confirmed" })).unwrap();
        assert_eq!(
            format!("{:?}", EventData::from(event)),
            format!("{:?}", expected),
        );
    }

    #[test]
    fn test_event_try_from() {
        let data = json!({
            "user_id": 5,
            "hotel_id": 10,
            "room_id": 201,
            "period": { "start": "2024-04-01", "end": "2024-04-04" },
            "guests": 2,
            "total": { "amount": 45000, "currency": "JPY" },
        });
        let event = ResolvedEvent {
            event: Some(RecordedEvent {
                stream_id: "booking-77".to_owned(),
                id: Default::default(),
                revision: Default::default(),
                event_type: "BookingCreated".to_owned(),
                data: serde_json::to_vec(&data).unwrap().into(),
                metadata: Default::default(),
                custom_metadata: Default::default(),
                is_json: Default::default(),
                position: Position {
                    commit: Default::default(),
                    prepare: Default::default(),
                },
                created: Default::default(),
            }),
            link: None,
            commit_position: None,
        };
        match BookingEvent::try_from(&event).unwrap() {
            BookingEvent::BookingCreated {
                id,
                guests,
                period,
                ..
            } => {
                assert_eq!(*id, 77);
                assert_eq!(guests, 2);
                assert_eq!(period.start.to_string(), "2024-04-01");
                assert_eq!(period.end.to_string(), "2024-04-04");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
