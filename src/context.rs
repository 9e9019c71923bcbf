//! Mapping context
//!
//! Bundles the shared pieces every mapping operation needs: the metadata
//! cache, the attribute converter registry and the event manager. Clones
//! share the same state.

use std::sync::Arc;

use crate::config::MappingConfig;
use crate::convert::{EntityConverter, GraphConverter, KeyValueConverter};
use crate::core::Result;
use crate::event::EventManager;
use crate::mapping::{AttributeConverter, Converters, EntitiesMetadata, Entity, EntityMetadata};
use crate::query::{MapperDelete, MapperSelect};

#[derive(Debug, Clone)]
pub struct MappingContext {
    entities: Arc<EntitiesMetadata>,
    converters: Arc<Converters>,
    events: Arc<EventManager>,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::from_parts(MappingConfig::default())
    }
}

impl MappingContext {
    /// Creates a context with a validated configuration.
    pub fn new(config: MappingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: MappingConfig) -> Self {
        Self {
            entities: Arc::new(EntitiesMetadata::new(config)),
            converters: Arc::new(Converters::new()),
            events: Arc::new(EventManager::new()),
        }
    }

    pub fn config(&self) -> &MappingConfig {
        self.entities.config()
    }

    pub fn entities(&self) -> &Arc<EntitiesMetadata> {
        &self.entities
    }

    pub fn converters(&self) -> &Arc<Converters> {
        &self.converters
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn register_converter<C: AttributeConverter>(&self, converter: C) -> Result<()> {
        self.converters.register(converter)
    }

    /// Loads (or fetches the cached) metadata of `T`.
    pub fn load<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        self.entities.get::<T>()
    }

    pub fn entity_converter(&self) -> EntityConverter {
        EntityConverter::new(
            Arc::clone(&self.entities),
            Arc::clone(&self.converters),
            Arc::clone(&self.events),
        )
    }

    pub fn graph_converter(&self) -> GraphConverter {
        GraphConverter::new(self.entity_converter())
    }

    pub fn key_value_converter(&self) -> KeyValueConverter {
        KeyValueConverter::new(self.entity_converter())
    }

    /// Query builder over `T` that only produces a [`crate::query::SelectQuery`].
    pub fn select<T: Entity>(&self) -> Result<MapperSelect<T>> {
        Ok(MapperSelect::new(self.load::<T>()?, Arc::clone(&self.converters)))
    }

    pub fn delete<T: Entity>(&self) -> Result<MapperDelete<T>> {
        Ok(MapperDelete::new(self.load::<T>()?, Arc::clone(&self.converters)))
    }
}
