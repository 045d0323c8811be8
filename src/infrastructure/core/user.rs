use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{User, UserEvent, UserId, UserRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによる利用者リポジトリ
pub type EventStoreUserRepository = EventStoreRepository<User>;

#[async_trait]
impl UserRepository for EventStoreRepository<User> {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut User) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut User) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<UserEvent> for EventData {
    fn from(value: UserEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for UserEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
