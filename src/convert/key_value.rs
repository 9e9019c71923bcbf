//! Key-value conversion. The key is the entity's id and the value holds the
//! whole native record, id included.

use crate::convert::EntityConverter;
use crate::core::{MapperError, Record, Result, Value};
use crate::mapping::{Entity, EntityMetadata};

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    key: Value,
    value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_parts(self) -> (Value, Value) {
        (self.key, self.value)
    }
}

pub struct KeyValueConverter {
    converter: EntityConverter,
}

impl KeyValueConverter {
    pub fn new(converter: EntityConverter) -> Self {
        Self { converter }
    }

    /// Fires `PreKeyValueEntity` before conversion and `PreKeyValue` once the
    /// pair is built. An entity without an id value cannot be keyed.
    pub fn to_key_value<T: Entity>(&self, entity: &T) -> Result<KeyValue> {
        self.converter.events().fire_pre_key_value_entity(entity)?;
        let (record, metadata) = self.converter.to_record_with_metadata(entity)?;
        let key = id_key(&metadata)?;
        let id = record
            .find(key)
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| {
                MapperError::Mapping(format!(
                    "{} has no id value to use as a key",
                    metadata.type_name()
                ))
            })?;

        let pair = KeyValue::new(id, Value::Record(record.into_elements()));
        self.converter.events().fire_pre_key_value(&pair)?;
        Ok(pair)
    }

    /// Fires `PostKeyValue` before conversion and `PostKeyValueEntity` on the
    /// rebuilt entity. The key wins over any id stored in the value.
    pub fn to_entity<T: Entity>(&self, pair: &KeyValue) -> Result<T> {
        self.converter.events().fire_post_key_value(pair)?;
        let Value::Record(elements) = pair.value() else {
            return Err(MapperError::TypeMismatch(format!(
                "Key-value entry '{}' holds {} instead of a record",
                pair.key(),
                pair.value().type_name()
            )));
        };

        let metadata = self.converter.entities().get::<T>()?;
        let mut record = Record::with_elements(metadata.name(), elements.clone());
        let concrete = self.converter.concrete_metadata(&metadata, record.elements())?;
        record.add(id_key(&concrete)?, pair.key().clone());

        let entity: T = self.converter.to_entity(&record)?;
        self.converter.events().fire_post_key_value_entity(&entity)?;
        Ok(entity)
    }
}

fn id_key(metadata: &EntityMetadata) -> Result<&str> {
    metadata.id().map(|field| field.name()).ok_or_else(|| {
        MapperError::Mapping(format!("{} declares no id field", metadata.type_name()))
    })
}
