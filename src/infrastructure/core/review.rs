use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Review, ReviewEvent, ReviewId, ReviewRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによるレビューリポジトリ
pub type EventStoreReviewRepository = EventStoreRepository<Review>;

#[async_trait]
impl ReviewRepository for EventStoreRepository<Review> {
    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Review) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Review) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<ReviewEvent> for EventData {
    fn from(value: ReviewEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for ReviewEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
