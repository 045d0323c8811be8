use async_trait::async_trait;
use derive_more::{Deref, Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, EventQueue, Id};

use super::{BookingId, Money};

/// 決済リポジトリ
#[async_trait]
pub trait PaymentRepository {
    /// IDで決済を検索する
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DataAccessError>;
    /// 決済を保存する
    async fn save(&mut self, entity: &mut Payment) -> Result<bool, DataAccessError>;
    /// 決済を削除する
    async fn delete(&mut self, entity: &mut Payment) -> Result<bool, DataAccessError>;
}

/// 決済ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default, Hash,
)]
pub struct PaymentId(u64);

impl Id for PaymentId {
    type Inner = u64;
}

/// 決済イベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEvent {
    /// 決済が要求された
    PaymentRequested {
        id: PaymentId,
        booking_id: BookingId,
        amount: Money,
        method: PaymentMethod,
    },
    /// ステータスが変更された
    StatusChanged { id: PaymentId, status: PaymentStatus },
    /// 決済が削除された
    PaymentDeleted { id: PaymentId },
}

impl Event for PaymentEvent {
    type Id = PaymentId;

    fn is_creation(&self) -> bool {
        matches!(self, PaymentEvent::PaymentRequested { .. })
    }
}

/// 決済エンティティ
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    booking_id: BookingId,
    amount: Money,
    method: PaymentMethod,
    status: PaymentStatus,
    #[serde(skip)]
    events: EventQueue<PaymentEvent>,
}

impl Payment {
    pub fn request(
        id: PaymentId,
        booking_id: BookingId,
        amount: Money,
        method: PaymentMethod,
    ) -> Self {
        let mut entity = Payment {
            id,
            booking_id,
            amount: amount.clone(),
            method,
            ..Default::default()
        };
        entity.events.push(PaymentEvent::PaymentRequested {
            id,
            booking_id,
            amount,
            method,
        });
        entity
    }

    pub fn change_status(&mut self, status: PaymentStatus) -> Result<(), PaymentError> {
        self.validate_status(&status)?;
        self.status = status;
        self.events.push(PaymentEvent::StatusChanged {
            id: self.id,
            status,
        });
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), PaymentError> {
        self.change_status(PaymentStatus::Completed)
    }

    pub fn fail(&mut self) -> Result<(), PaymentError> {
        self.change_status(PaymentStatus::Failed)
    }

    pub fn refund(&mut self) -> Result<(), PaymentError> {
        self.change_status(PaymentStatus::Refunded)
    }

    /// 失敗した決済の再試行
    pub fn retry(&mut self) -> Result<(), PaymentError> {
        self.change_status(PaymentStatus::Pending)
    }

    pub fn delete(&mut self) {
        self.events.push(PaymentEvent::PaymentDeleted { id: self.id });
    }

    pub fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    fn validate_id(&self, id: &PaymentId) -> Result<(), PaymentError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(PaymentError::MismatchedId),
        }
    }

    fn validate_status(&self, status: &PaymentStatus) -> Result<(), PaymentError> {
        match (&self.status, status) {
            (PaymentStatus::Pending, PaymentStatus::Completed)
            | (PaymentStatus::Pending, PaymentStatus::Failed)
            | (PaymentStatus::Failed, PaymentStatus::Pending)
            | (PaymentStatus::Completed, PaymentStatus::Refunded) => Ok(()),
            _ => Err(PaymentError::InvalidStatusTransition),
        }
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    const ENTITY_NAME: &'static str = "payment";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            PaymentEvent::PaymentRequested { .. } => Ok(()),
            PaymentEvent::StatusChanged { id, status } => {
                self.validate_id(id)?;
                self.validate_status(status)
            }
            PaymentEvent::PaymentDeleted { id } => self.validate_id(id),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            PaymentEvent::PaymentRequested {
                id,
                booking_id,
                amount,
                method,
            } => {
                if self.id != id {
                    *self = Self::request(id, booking_id, amount, method);
                }
            }
            PaymentEvent::StatusChanged { id, status } => {
                if self.id == id {
                    if let Err(_e) = self.change_status(status) {}
                }
            }
            PaymentEvent::PaymentDeleted { .. } => {}
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Payment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.booking_id == other.booking_id
            && self.amount == other.amount
            && self.method == other.method
            && self.status == other.status
    }
}

impl Eq for Payment {}

/// 決済エラー
#[derive(Error, Display, Debug)]
pub enum PaymentError {
    /// IDが一致しません
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// ステータス遷移が不正です
    #[display(fmt = "Invalid status transition")]
    InvalidStatusTransition,
}

/// 決済手段
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    Cash,
    Transfer,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Card
    }
}

/// 決済ステータス
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// 処理待ち
    Pending,
    /// 完了
    Completed,
    /// 失敗
    Failed,
    /// 返金済み
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::core::Currency;

    fn payment() -> Payment {
        Payment::request(
            PaymentId(501),
            BookingId::from(77),
            Money::new(45000, Currency::JPY),
            PaymentMethod::Card,
        )
    }

    #[test]
    fn test_payment_request() {
        let payment = payment();
        assert_eq!(payment.id(), PaymentId(501));
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }

    #[test]
    fn test_complete_then_refund() {
        let mut payment = payment();
        payment.complete().unwrap();
        assert!(payment.fail().is_err());
        payment.refund().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Refunded);
    }

    #[test]
    fn test_failed_payment_can_retry() {
        let mut payment = payment();
        payment.fail().unwrap();
        assert!(payment.refund().is_err());
        payment.retry().unwrap();
        payment.complete().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Completed);
    }
}
