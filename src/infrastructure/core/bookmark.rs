use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Bookmark, BookmarkEvent, BookmarkId, BookmarkRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによるブックマークリポジトリ
pub type EventStoreBookmarkRepository = EventStoreRepository<Bookmark>;

#[async_trait]
impl BookmarkRepository for EventStoreRepository<Bookmark> {
    async fn find_by_id(&self, id: BookmarkId) -> Result<Option<Bookmark>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Bookmark) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Bookmark) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<BookmarkEvent> for EventData {
    fn from(value: BookmarkEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for BookmarkEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
