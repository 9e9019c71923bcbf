//! Persist workflow over a [`RecordManager`].
//!
//! Every write runs the same sequence: convert the entity (firing
//! `PreEntity`), fire `PreMappedEntity` and `PreRecord`, hand the record to
//! the store, fire `PostRecord`, convert the stored record back (firing
//! `PostEntity`) and finally fire `PostMappedEntity`.

use std::any::type_name;
use std::sync::Arc;

use tracing::{Instrument, Level, event, info_span};

use crate::context::MappingContext;
use crate::convert::EntityConverter;
use crate::core::{MapperError, Result};
use crate::mapping::{Entity, EntityMetadata};
use crate::query::mapper::convert_argument;
use crate::query::{DeleteQuery, MapperDelete, MapperSelect, QueryArg, SelectQuery};
use crate::store::RecordManager;

enum Write<'k> {
    Insert,
    Update(&'k str),
}

/// Runs entity operations against a record manager.
///
/// ```
/// use nosqlmap::prelude::*;
///
/// #[derive(Debug, Default, PartialEq, Entity)]
/// struct Person {
///     #[column(id)]
///     id: i64,
///     name: String,
/// }
///
/// # tokio_test::block_on(async {
/// let template = MappingTemplate::new(InMemoryRecordManager::new(), MappingContext::default());
/// template.insert(&Person { id: 1, name: "Ada".into() }).await?;
///
/// let ada = template.find_by_id::<Person>("1").await?;
/// assert_eq!(ada.map(|p| p.name), Some("Ada".to_string()));
/// # Ok::<(), nosqlmap::MapperError>(())
/// # }).unwrap();
/// ```
pub struct MappingTemplate<M> {
    manager: M,
    context: MappingContext,
    converter: EntityConverter,
}

impl<M: RecordManager> MappingTemplate<M> {
    pub fn new(manager: M, context: MappingContext) -> Self {
        let converter = context.entity_converter();
        Self {
            manager,
            context,
            converter,
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn context(&self) -> &MappingContext {
        &self.context
    }

    pub fn converter(&self) -> &EntityConverter {
        &self.converter
    }

    /// Inserts `entity` and returns it as the store kept it.
    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<T> {
        let span = info_span!("template.insert", entity = %type_name::<T>());
        self.persist(entity, Write::Insert).instrument(span).await
    }

    /// Replaces the stored entity with the same id, inserting it when absent.
    pub async fn update<T: Entity>(&self, entity: &T) -> Result<T> {
        let id_key = self.id_column(entity)?;
        let span = info_span!("template.update", entity = %type_name::<T>(), id_key = %id_key);
        self.persist(entity, Write::Update(&id_key))
            .instrument(span)
            .await
    }

    pub async fn find_by_id<T: Entity>(&self, id: impl Into<QueryArg>) -> Result<Option<T>> {
        let (path, id) = self.id_lookup::<T>(id.into())?;
        self.select::<T>()?.where_(&path).eq(id).single_result().await
    }

    pub async fn delete_by_id<T: Entity>(&self, id: impl Into<QueryArg>) -> Result<u64> {
        let (path, id) = self.id_lookup::<T>(id.into())?;
        self.delete::<T>()?.where_(&path).eq(id).execute().await
    }

    /// Number of stored records of `T`. A variant counts only the records
    /// carrying its discriminator.
    pub async fn count<T: Entity>(&self) -> Result<u64> {
        let (_, query) = self.select::<T>()?.into_parts();
        let query = query?;
        self.manager.count(&query.name, query.condition.as_ref()).await
    }

    /// Select builder bound to this template; finish it with
    /// [`MapperSelect::result`] and friends.
    pub fn select<T: Entity>(&self) -> Result<MapperSelect<T, &Self>> {
        Ok(MapperSelect::with_executor(
            self.context.load::<T>()?,
            Arc::clone(self.context.converters()),
            self,
        ))
    }

    pub fn delete<T: Entity>(&self) -> Result<MapperDelete<T, &Self>> {
        Ok(MapperDelete::with_executor(
            self.context.load::<T>()?,
            Arc::clone(self.context.converters()),
            self,
        ))
    }

    async fn persist<T: Entity>(&self, entity: &T, write: Write<'_>) -> Result<T> {
        let events = self.context.events();

        let record = self.converter.to_record(entity)?;
        events.fire_pre_mapped_entity(entity)?;
        events.fire_pre_record(&record)?;

        let stored = match write {
            Write::Insert => self.manager.insert(record).await,
            Write::Update(id_key) => {
                if !record.contains(id_key) {
                    return Err(MapperError::Mapping(format!(
                        "Cannot update {} without a value for '{}'",
                        type_name::<T>(),
                        id_key
                    )));
                }
                self.manager.update(record, id_key).await
            }
        };
        let stored = match stored {
            Ok(stored) => stored,
            Err(err) => {
                event!(Level::ERROR, error = %err, "store write failed");
                return Err(err);
            }
        };

        events.fire_post_record(&stored)?;
        let result = self.converter.to_entity::<T>(&stored)?;
        events.fire_post_mapped_entity(&result)?;
        event!(Level::DEBUG, record = %stored.name(), "entity persisted");
        Ok(result)
    }

    async fn run_select<T: Entity>(&self, query: SelectQuery) -> Result<Vec<T>> {
        self.context.events().fire_pre_query(&query)?;
        let records = self.manager.select(&query).await?;
        event!(Level::DEBUG, matched = records.len(), "select executed");
        records
            .iter()
            .map(|record| self.converter.to_entity::<T>(record))
            .collect()
    }

    async fn run_delete(&self, query: DeleteQuery) -> Result<u64> {
        self.context.events().fire_pre_delete_query(&query)?;
        let removed = self.manager.delete(&query).await?;
        event!(Level::DEBUG, removed, "delete executed");
        Ok(removed)
    }

    /// Native id key of the concrete type of `entity`.
    fn id_column<T: Entity>(&self, entity: &T) -> Result<String> {
        let metadata = self.concrete_metadata(entity)?;
        metadata
            .id()
            .map(|field| field.name().to_string())
            .ok_or_else(|| no_id(&metadata))
    }

    /// Query path and argument of an id lookup on `T`. Polymorphic parents
    /// declare no fields of their own, so the id is converted through the id
    /// field of their first variant declaring one and matched on its native key.
    fn id_lookup<T: Entity>(&self, id: QueryArg) -> Result<(String, QueryArg)> {
        let metadata = self.context.load::<T>()?;
        if let Some(field) = metadata.id() {
            return Ok((field.field_name().to_string(), id));
        }
        if let Some(polymorphic) = metadata.polymorphic() {
            for variant in polymorphic.variants() {
                let variant = self.context.entities().get_by_ref(variant)?;
                if let Some(field) = variant.id() {
                    let value = convert_argument(field, self.context.converters(), id)?;
                    return Ok((field.name().to_string(), QueryArg::Native(value)));
                }
            }
        }
        Err(no_id(&metadata))
    }

    fn concrete_metadata<T: Entity>(&self, entity: &T) -> Result<Arc<EntityMetadata>> {
        let metadata = self.context.load::<T>()?;
        match metadata.polymorphic() {
            Some(polymorphic) => {
                let concrete = polymorphic.as_concrete(entity)?;
                self.context.entities().get_by_id((*concrete).type_id())
            }
            None => Ok(metadata),
        }
    }
}

fn no_id(metadata: &EntityMetadata) -> MapperError {
    MapperError::Mapping(format!("{} declares no id field", metadata.type_name()))
}

impl<'t, T: Entity, M: RecordManager> MapperSelect<T, &'t MappingTemplate<M>> {
    /// Runs the query and converts every matching record.
    pub async fn result(self) -> Result<Vec<T>> {
        let (template, query) = self.into_parts();
        let query = query?;
        let span = info_span!("template.select", record = %query.name);
        template.run_select(query).instrument(span).await
    }

    /// The only match, if any; more than one is an error.
    pub async fn single_result(self) -> Result<Option<T>> {
        let mut entities = self.result().await?;
        match entities.len() {
            0 => Ok(None),
            1 => Ok(entities.pop()),
            n => Err(MapperError::NonUniqueResult(format!(
                "Expected at most one {} but found {}",
                type_name::<T>(),
                n
            ))),
        }
    }

    pub async fn single_result_required(self) -> Result<T> {
        self.single_result().await?.ok_or_else(|| {
            MapperError::EmptyResult(format!("No {} matched the query", type_name::<T>()))
        })
    }

    pub async fn first(self) -> Result<Option<T>> {
        Ok(self.limit(1).result().await?.into_iter().next())
    }
}

impl<'t, T: Entity, M: RecordManager> MapperDelete<T, &'t MappingTemplate<M>> {
    /// Runs the delete and returns how many records were removed.
    pub async fn execute(self) -> Result<u64> {
        let (template, query) = self.into_parts();
        let query = query?;
        let span = info_span!("template.delete", record = %query.name);
        template.run_delete(query).instrument(span).await
    }
}
