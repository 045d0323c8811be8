use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Room, RoomEvent, RoomId, RoomRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによる客室リポジトリ
pub type EventStoreRoomRepository = EventStoreRepository<Room>;

#[async_trait]
impl RoomRepository for EventStoreRepository<Room> {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Room) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Room) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<RoomEvent> for EventData {
    fn from(value: RoomEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for RoomEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
