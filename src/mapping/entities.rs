use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use log::{debug, trace};

use crate::config::MappingConfig;
use crate::core::{MapperError, Result};
use crate::mapping::class_converter::ClassConverter;
use crate::mapping::descriptor::{Entity, TypeRef};
use crate::mapping::metadata::{EntityMetadata, InheritanceMetadata};

/// Process-wide cache of entity metadata.
///
/// Metadata is built on first access and never invalidated. Two threads
/// racing on the first access may both build it; the results are
/// equivalent and the last insert wins.
#[derive(Debug, Default)]
pub struct EntitiesMetadata {
    class_converter: ClassConverter,
    by_type: RwLock<HashMap<TypeId, Arc<EntityMetadata>>>,
    by_name: RwLock<HashMap<String, TypeId>>,
    groups: RwLock<HashMap<TypeId, BTreeMap<String, InheritanceMetadata>>>,
}

impl EntitiesMetadata {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            class_converter: ClassConverter::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MappingConfig {
        self.class_converter.config()
    }

    pub fn get<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        self.get_by_ref(&TypeRef::of::<T>())
    }

    pub fn get_by_ref(&self, type_ref: &TypeRef) -> Result<Arc<EntityMetadata>> {
        if let Some(metadata) = self.by_type.read()?.get(&type_ref.type_id()) {
            trace!("Metadata cache hit for {}", type_ref.type_name());
            return Ok(Arc::clone(metadata));
        }

        let metadata = self.class_converter.create(&type_ref.descriptor())?;
        self.register(metadata)
    }

    /// Metadata of a type that was already loaded, directly or as a variant or
    /// nested element of another type.
    pub fn get_by_id(&self, type_id: TypeId) -> Result<Arc<EntityMetadata>> {
        self.by_type
            .read()?
            .get(&type_id)
            .cloned()
            .ok_or_else(|| MapperError::Mapping(format!("No entity metadata for {:?}", type_id)))
    }

    /// Metadata registered under a native record name. Variants share the
    /// name of their parent, so the parent is returned for those.
    pub fn find_by_name(&self, name: &str) -> Result<Arc<EntityMetadata>> {
        let type_id = self.by_name.read()?.get(name).copied().ok_or_else(|| {
            MapperError::Mapping(format!("No entity registered under the name '{}'", name))
        })?;
        self.get_by_id(type_id)
    }

    /// Variants of a polymorphic parent keyed by discriminator value.
    pub fn find_by_parent_group_by_discriminator_value(
        &self,
        parent: TypeId,
    ) -> Result<BTreeMap<String, InheritanceMetadata>> {
        Ok(self
            .groups
            .read()?
            .get(&parent)
            .cloned()
            .unwrap_or_default())
    }

    /// Adds built metadata to the cache. Variants of a polymorphic parent are
    /// loaded before the parent becomes visible, so a cached parent can always
    /// resolve its discriminators.
    pub fn register(&self, metadata: EntityMetadata) -> Result<Arc<EntityMetadata>> {
        let metadata = Arc::new(metadata);
        let type_id = metadata.entity_type_id();

        if let Some(polymorphic) = metadata.polymorphic() {
            for variant in polymorphic.variants() {
                self.get_by_ref(variant)?;
            }
        }

        if let Some(inheritance) = metadata.inheritance() {
            let mut groups = self.groups.write()?;
            let group = groups.entry(inheritance.parent()).or_default();
            if let Some(existing) = group.get(inheritance.discriminator_value()) {
                if existing.entity() != type_id {
                    return Err(MapperError::Configuration(format!(
                        "Discriminator value '{}' of {} is already used by another variant",
                        inheritance.discriminator_value(),
                        metadata.type_name()
                    )));
                }
            }
            group.insert(
                inheritance.discriminator_value().to_string(),
                inheritance.clone(),
            );
        } else {
            self.by_name
                .write()?
                .insert(metadata.name().to_string(), type_id);
        }

        // a racing first access may have registered the type already
        let metadata = Arc::clone(self.by_type.write()?.entry(type_id).or_insert(metadata));
        debug!("Registered entity metadata {} as '{}'", metadata.type_name(), metadata.name());
        Ok(metadata)
    }

    pub fn len(&self) -> usize {
        self.by_type.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
