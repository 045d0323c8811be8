use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{
    Notification, NotificationEvent, NotificationId, NotificationRepository,
};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによる通知リポジトリ
pub type EventStoreNotificationRepository = EventStoreRepository<Notification>;

#[async_trait]
impl NotificationRepository for EventStoreRepository<Notification> {
    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Notification) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Notification) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<NotificationEvent> for EventData {
    fn from(value: NotificationEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for NotificationEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
