use async_trait::async_trait;
use eventstore::{EventData, ResolvedEvent};

use crate::domain::core::{Payment, PaymentEvent, PaymentId, PaymentRepository};
use crate::domain::DataAccessError;
use crate::infrastructure::{
    from_event, try_from_resolved_event, EventConvertError, EventStoreRepository,
};

/// EventStoreDBによる決済リポジトリ
pub type EventStorePaymentRepository = EventStoreRepository<Payment>;

#[async_trait]
impl PaymentRepository for EventStoreRepository<Payment> {
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DataAccessError> {
        self.find(id).await
    }

    async fn save(&mut self, entity: &mut Payment) -> Result<bool, DataAccessError> {
        self.store(entity).await
    }

    async fn delete(&mut self, entity: &mut Payment) -> Result<bool, DataAccessError> {
        self.remove(entity).await
    }
}

impl From<PaymentEvent> for EventData {
    fn from(value: PaymentEvent) -> Self {
        from_event(value)
    }
}

impl TryFrom<&ResolvedEvent> for PaymentEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}
