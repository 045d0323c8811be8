use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Hotel, HotelEvent, HotelId, HotelRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによるホテルリポジトリ
pub type EventStoreHotelRepository = EventStoreRepository<Hotel>;

#[async_trait]
impl HotelRepository for EventStoreRepository<Hotel> {
    async fn find_by_id(&self, id: HotelId) -> Result<Option<Hotel>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Hotel) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Hotel) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<HotelEvent> for EventData {
    fn from(value: HotelEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for HotelEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}

#[cfg(test)]
mod tests {
    use eventstore::EventData;
    use serde_json::json;

    use crate::domain::core::{HotelEvent, StarRating};

    #[test]
    fn test_event_data_from() {
        let event = HotelEvent::HotelOpened {
            id: 10.into(),
            name: "旅荘 月見".to_owned(),
            description: "静かな温泉宿です。".to_owned(),
            address: "箱根町1-2-3".to_owned(),
            city: "箱根".to_owned(),
            star_rating: StarRating::new(4).unwrap(),
            amenities: vec!["温泉".to_owned()],
        };
        let expected = EventData::json(
            "HotelOpened",
            json!({
                "name": "旅荘 月見",
                "description": "静かな温泉宿です。",
                "address": "箱根町1-2-3",
                "city": "箱根",
                "star_rating": 4,
                "amenities": ["温泉"],
            }),
        )
        .unwrap();
        assert_eq!(
            format!("{:?}", EventData::from(event)),
            format!("{:?}", expected),
        );
    }
}
