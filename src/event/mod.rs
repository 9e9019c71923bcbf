//! Lifecycle notifications around conversions and store operations.
//!
//! Listeners run synchronously in subscription order. The first failing
//! listener stops the fan-out and its error is returned to the caller, which
//! aborts the surrounding operation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use log::trace;

use crate::convert::KeyValue;
use crate::core::{MapperError, Record, Result};
use crate::query::{DeleteQuery, SelectQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPhase {
    /// A native record is about to be written.
    PreRecord,
    /// A native record was written.
    PostRecord,
    /// An entity is about to be converted for persistence.
    PreEntity,
    /// An entity was rebuilt from a native record.
    PostEntity,
    /// An entity is about to be persisted through a template.
    PreMappedEntity,
    /// An entity was persisted through a template.
    PostMappedEntity,
    PreQuery,
    PreDeleteQuery,
    /// A key-value pair is about to be written.
    PreKeyValue,
    /// A key-value pair was read back.
    PostKeyValue,
    PreKeyValueEntity,
    PostKeyValueEntity,
}

#[derive(Clone, Copy)]
pub enum EventPayload<'a> {
    Entity(&'a dyn Any),
    Record(&'a Record),
    Query(&'a SelectQuery),
    DeleteQuery(&'a DeleteQuery),
    KeyValue(&'a KeyValue),
}

impl<'a> EventPayload<'a> {
    pub fn entity<T: Any>(&self) -> Option<&'a T> {
        match *self {
            EventPayload::Entity(entity) => entity.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&'a Record> {
        match *self {
            EventPayload::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn query(&self) -> Option<&'a SelectQuery> {
        match *self {
            EventPayload::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn delete_query(&self) -> Option<&'a DeleteQuery> {
        match *self {
            EventPayload::DeleteQuery(query) => Some(query),
            _ => None,
        }
    }

    pub fn key_value(&self) -> Option<&'a KeyValue> {
        match *self {
            EventPayload::KeyValue(pair) => Some(pair),
            _ => None,
        }
    }
}

impl fmt::Debug for EventPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPayload::Entity(_) => write!(f, "Entity(..)"),
            EventPayload::Record(record) => write!(f, "Record({})", record.name()),
            EventPayload::Query(query) => write!(f, "Query({})", query.name),
            EventPayload::DeleteQuery(query) => write!(f, "DeleteQuery({})", query.name),
            EventPayload::KeyValue(pair) => write!(f, "KeyValue({})", pair.key()),
        }
    }
}

pub type Listener = Arc<dyn Fn(EventPhase, &EventPayload<'_>) -> Result<()> + Send + Sync>;

#[derive(Default)]
pub struct EventManager {
    listeners: RwLock<HashMap<EventPhase, Vec<Listener>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, phase: EventPhase, listener: F) -> Result<()>
    where
        F: Fn(EventPhase, &EventPayload<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write()?;
        listeners.entry(phase).or_default().push(Arc::new(listener));
        Ok(())
    }

    /// Subscribes one listener to several phases.
    pub fn subscribe_all<F>(&self, phases: &[EventPhase], listener: F) -> Result<()>
    where
        F: Fn(EventPhase, &EventPayload<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut listeners = self.listeners.write()?;
        for phase in phases {
            listeners.entry(*phase).or_default().push(Arc::clone(&listener));
        }
        Ok(())
    }

    pub fn notify(&self, phase: EventPhase, payload: EventPayload<'_>) -> Result<()> {
        // listeners may subscribe further listeners, so none run under the lock
        let listeners: Vec<Listener> = match self.listeners.read()?.get(&phase) {
            Some(listeners) => listeners.clone(),
            None => return Ok(()),
        };

        trace!("Firing {:?} to {} listeners: {:?}", phase, listeners.len(), payload);
        for listener in listeners {
            listener(phase, &payload).map_err(|err| match err {
                MapperError::Listener(_) => err,
                other => MapperError::Listener(format!("{:?} listener failed: {}", phase, other)),
            })?;
        }
        Ok(())
    }

    pub fn listener_count(&self, phase: EventPhase) -> usize {
        self.listeners
            .read()
            .map(|listeners| listeners.get(&phase).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn fire_pre_record(&self, record: &Record) -> Result<()> {
        self.notify(EventPhase::PreRecord, EventPayload::Record(record))
    }

    pub fn fire_post_record(&self, record: &Record) -> Result<()> {
        self.notify(EventPhase::PostRecord, EventPayload::Record(record))
    }

    pub fn fire_pre_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PreEntity, EventPayload::Entity(entity))
    }

    pub fn fire_post_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PostEntity, EventPayload::Entity(entity))
    }

    pub fn fire_pre_mapped_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PreMappedEntity, EventPayload::Entity(entity))
    }

    pub fn fire_post_mapped_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PostMappedEntity, EventPayload::Entity(entity))
    }

    pub fn fire_pre_query(&self, query: &SelectQuery) -> Result<()> {
        self.notify(EventPhase::PreQuery, EventPayload::Query(query))
    }

    pub fn fire_pre_delete_query(&self, query: &DeleteQuery) -> Result<()> {
        self.notify(EventPhase::PreDeleteQuery, EventPayload::DeleteQuery(query))
    }

    pub fn fire_pre_key_value(&self, pair: &KeyValue) -> Result<()> {
        self.notify(EventPhase::PreKeyValue, EventPayload::KeyValue(pair))
    }

    pub fn fire_post_key_value(&self, pair: &KeyValue) -> Result<()> {
        self.notify(EventPhase::PostKeyValue, EventPayload::KeyValue(pair))
    }

    pub fn fire_pre_key_value_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PreKeyValueEntity, EventPayload::Entity(entity))
    }

    pub fn fire_post_key_value_entity(&self, entity: &dyn Any) -> Result<()> {
        self.notify(EventPhase::PostKeyValueEntity, EventPayload::Entity(entity))
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phases = self
            .listeners
            .read()
            .map(|listeners| listeners.len())
            .unwrap_or(0);
        f.debug_struct("EventManager").field("phases", &phases).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_listeners_run_in_order() {
        let events = EventManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for id in 1..=3 {
            let seen = Arc::clone(&seen);
            events
                .subscribe(EventPhase::PreRecord, move |_, _| {
                    seen.lock().unwrap().push(id);
                    Ok(())
                })
                .unwrap();
        }

        events.fire_pre_record(&Record::new("Person")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(events.listener_count(EventPhase::PreRecord), 3);
        assert_eq!(events.listener_count(EventPhase::PostRecord), 0);
    }

    #[test]
    fn test_first_failure_stops_fan_out() {
        let events = EventManager::new();
        let reached = Arc::new(Mutex::new(false));

        events
            .subscribe(EventPhase::PreEntity, |_, _| {
                Err(MapperError::Mapping("rejected".to_string()))
            })
            .unwrap();
        let flag = Arc::clone(&reached);
        events
            .subscribe(EventPhase::PreEntity, move |_, _| {
                *flag.lock().unwrap() = true;
                Ok(())
            })
            .unwrap();

        let err = events.fire_pre_entity(&42_i64).err().unwrap();
        assert!(matches!(err, MapperError::Listener(msg) if msg.contains("rejected")));
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_payload_accessors() {
        let events = EventManager::new();
        events
            .subscribe_all(&[EventPhase::PreQuery, EventPhase::PostEntity], |phase, payload| {
                match phase {
                    EventPhase::PreQuery => assert_eq!(payload.query().unwrap().name, "Person"),
                    _ => assert_eq!(payload.entity::<String>().unwrap(), "Ada"),
                }
                Ok(())
            })
            .unwrap();

        events.fire_pre_query(&SelectQuery::new("Person")).unwrap();
        events.fire_post_entity(&"Ada".to_string()).unwrap();
    }

    #[test]
    fn test_key_value_phases_carry_their_payload() {
        let events = EventManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        events
            .subscribe_all(
                &[
                    EventPhase::PreKeyValue,
                    EventPhase::PostKeyValue,
                    EventPhase::PreKeyValueEntity,
                    EventPhase::PostKeyValueEntity,
                ],
                move |phase, payload| {
                    let key = match payload.key_value() {
                        Some(pair) => pair.key().to_string(),
                        None => payload.entity::<String>().cloned().unwrap_or_default(),
                    };
                    log.lock().unwrap().push((phase, key));
                    Ok(())
                },
            )
            .unwrap();

        let pair = KeyValue::new("user:1", "Ada");
        events.fire_pre_key_value_entity(&"Ada".to_string()).unwrap();
        events.fire_pre_key_value(&pair).unwrap();
        events.fire_post_key_value(&pair).unwrap();
        events.fire_post_key_value_entity(&"Ada".to_string()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (EventPhase::PreKeyValueEntity, "Ada".to_string()),
                (EventPhase::PreKeyValue, "user:1".to_string()),
                (EventPhase::PostKeyValue, "user:1".to_string()),
                (EventPhase::PostKeyValueEntity, "Ada".to_string()),
            ]
        );
    }
}
