pub mod core;

use std::{fmt::Display, marker::PhantomData, str::FromStr};

use eventstore::{
    AppendToStreamOptions, Client, EventData, ExpectedRevision, ResolvedEvent,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::domain::{Aggregation, DataAccessError, Entity, Event, Id};

impl From<eventstore::Error> for DataAccessError {
    fn from(value: eventstore::Error) -> Self {
        match value {
            eventstore::Error::ConnectionClosed
            | eventstore::Error::Grpc { .. }
            | eventstore::Error::GrpcConnectionError(_)
            | eventstore::Error::DeadlineExceeded
            | eventstore::Error::InitializationError(_) => Self::ConnectionError(Box::new(value)),
            eventstore::Error::ServerError(_)
            | eventstore::Error::NotLeaderException(_)
            | eventstore::Error::AccessDenied
            | eventstore::Error::UnsupportedFeature
            | eventstore::Error::InternalParsingError(_)
            | eventstore::Error::InternalClientError => Self::QueryError(Box::new(value)),
            eventstore::Error::ResourceNotFound | eventstore::Error::ResourceDeleted => {
                Self::ReadError(Box::new(value))
            }
            eventstore::Error::ResourceAlreadyExists
            | eventstore::Error::WrongExpectedVersion { .. } => Self::WriteError(Box::new(value)),
            eventstore::Error::IllegalStateError(_) => Self::ClientSideError(Box::new(value)),
        }
    }
}

impl From<EventConvertError> for DataAccessError {
    fn from(value: EventConvertError) -> Self {
        DataAccessError::ClientSideError(Box::new(value))
    }
}

/// イベント変換エラー
#[derive(Debug)]
pub struct EventConvertError;

impl std::error::Error for EventConvertError {}

impl Display for EventConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to convert event")
    }
}

impl From<serde_json::Error> for EventConvertError {
    fn from(_value: serde_json::Error) -> Self {
        EventConvertError
    }
}

/// ストリーム名 `<entity_name>-<id>` からIDを復元する
fn entity_id<I, T>(stream_id: &str) -> Option<I>
where
    I: Id<Inner = T>,
    T: FromStr,
{
    stream_id
        .split('-')
        .filter_map(|s| s.parse::<T>().ok())
        .map(I::from)
        .last()
}

pub fn stream_name<E: Entity>(id: E::Id) -> String {
    E::ENTITY_NAME.to_owned() + "-" + &id.to_string()
}

/// ドメインイベントをEventStoreDBのイベントへ変換する
///
/// イベント型名は列挙子の名前、IDはストリーム名が持つためデータからは取り除く。
pub fn from_event<E: Event>(event: E) -> EventData {
    let root = serde_json::to_value(event).expect("domain events are serializable");
    let event_type = root
        .as_object()
        .and_then(|o| o.keys().next().cloned())
        .expect("domain events are externally tagged");
    let mut data = root[event_type.as_str()].clone();
    if let Some(object) = data.as_object_mut() {
        object.remove("id");
    }
    EventData::json(event_type, data).expect("event payload is valid JSON")
}

pub fn try_from_resolved_event<E, I>(value: &ResolvedEvent) -> Result<E, EventConvertError>
where
    E: DeserializeOwned + Event<Id = I>,
    I: Id,
{
    let event = value.get_original_event();
    let id = entity_id::<I, I::Inner>(&event.stream_id).ok_or(EventConvertError)?;
    let mut data: Value = serde_json::from_slice(event.data.as_ref())?;
    data.as_object_mut()
        .ok_or(EventConvertError)?
        .insert("id".to_owned(), json!(id));
    let json = json!({ &event.event_type: data });
    Ok(serde_json::from_value(json)?)
}

/// EventStoreDBを永続化先とする汎用リポジトリ
///
/// 取得はストリームの全イベントを `apply` で畳み込み、保存は未確定イベントを
/// 期待リビジョン付きで追記する。
#[derive(Clone)]
pub struct EventStoreRepository<A> {
    client: Client,
    _aggregation: PhantomData<A>,
}

impl<A> EventStoreRepository<A>
where
    A: Aggregation + Send + Sync,
    A::Event: DeserializeOwned + Send + Sync,
    A::Id: Send + Sync,
{
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _aggregation: PhantomData,
        }
    }

    pub async fn find(&self, id: A::Id) -> Result<Option<A>, DataAccessError> {
        match self
            .client
            .read_stream(stream_name::<A>(id), &Default::default())
            .await
        {
            Ok(mut stream) => {
                let mut entity = A::default();
                loop {
                    match stream.next().await {
                        Ok(Some(e)) => entity.apply(try_from_resolved_event(&e)?),
                        Ok(None) => break,
                        Err(eventstore::Error::ResourceDeleted)
                        | Err(eventstore::Error::ResourceNotFound) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    }
                }
                if entity.peek().is_none() {
                    Ok(None)
                } else {
                    entity.clear();
                    Ok(Some(entity))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn store(&mut self, entity: &mut A) -> Result<bool, DataAccessError> {
        let stream_name = stream_name::<A>(entity.id());
        let rev = match entity.peek() {
            Some(e) if e.is_creation() => ExpectedRevision::NoStream,
            Some(_) => ExpectedRevision::StreamExists,
            None => return Ok(false),
        };
        self.client
            .append_to_stream(
                &stream_name,
                &AppendToStreamOptions::default().expected_revision(rev),
                entity
                    .pop_all()
                    .into_iter()
                    .map(from_event)
                    .collect::<Vec<_>>(),
            )
            .await?;
        Ok(true)
    }

    pub async fn remove(&mut self, entity: &mut A) -> Result<bool, DataAccessError> {
        let stream_name = stream_name::<A>(entity.id());
        self.client
            .delete_stream(&stream_name, &Default::default())
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::core::{Booking, BookingId};

    use super::*;

    #[test]
    fn test_stream_name() {
        assert_eq!(stream_name::<Booking>(BookingId::from(42)), "booking-42");
    }

    #[test]
    fn test_entity_id_from_stream() {
        assert_eq!(
            entity_id::<BookingId, u64>("booking-42"),
            Some(BookingId::from(42))
        );
        assert_eq!(entity_id::<BookingId, u64>("booking-"), None);
    }
}
