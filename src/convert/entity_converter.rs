//! Conversion between entity instances and native records.

use std::any::Any;
use std::sync::Arc;

use log::debug;

use crate::config::MappingConfig;
use crate::convert::field_value::FieldValue;
use crate::core::{Element, MapperError, Record, Result, Value};
use crate::event::EventManager;
use crate::mapping::constructor::{Argument, ConstructorBuilder};
use crate::mapping::field::unbox;
use crate::mapping::{
    Converters, EntitiesMetadata, Entity, EntityMetadata, FieldInput, FieldMapping,
    InheritanceMetadata, MappingType, PolymorphicMetadata, TypeRef,
};

fn find<'e>(elements: &'e [Element], key: &str) -> Option<&'e Value> {
    elements
        .iter()
        .find(|element| element.key == key)
        .map(|element| &element.value)
}

#[derive(Debug, Clone)]
pub struct EntityConverter {
    entities: Arc<EntitiesMetadata>,
    converters: Arc<Converters>,
    events: Arc<EventManager>,
}

impl EntityConverter {
    pub fn new(
        entities: Arc<EntitiesMetadata>,
        converters: Arc<Converters>,
        events: Arc<EventManager>,
    ) -> Self {
        Self {
            entities,
            converters,
            events,
        }
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

    fn config(&self) -> &MappingConfig {
        self.entities.config()
    }

    /// Converts an entity into a native record.
    pub fn to_record<T: Entity>(&self, entity: &T) -> Result<Record> {
        self.to_record_with_metadata(entity).map(|(record, _)| record)
    }

    /// [`EntityConverter::to_record`] together with the metadata of the
    /// concrete type that produced the record.
    pub(crate) fn to_record_with_metadata<T: Entity>(
        &self,
        entity: &T,
    ) -> Result<(Record, Arc<EntityMetadata>)> {
        self.events.fire_pre_entity(entity)?;
        let metadata = self.entities.get::<T>()?;
        let (elements, metadata) = self.elements(entity, &metadata)?;
        Ok((Record::with_elements(metadata.name(), elements), metadata))
    }

    /// Native elements of `entity`, an instance of `type_ref`.
    pub fn to_elements(&self, entity: &dyn Any, type_ref: &TypeRef) -> Result<Vec<Element>> {
        let metadata = self.entities.get_by_ref(type_ref)?;
        self.elements(entity, &metadata).map(|(elements, _)| elements)
    }

    fn elements(
        &self,
        entity: &dyn Any,
        metadata: &Arc<EntityMetadata>,
    ) -> Result<(Vec<Element>, Arc<EntityMetadata>)> {
        let (entity, metadata) = match metadata.polymorphic() {
            Some(polymorphic) => {
                let concrete = polymorphic.as_concrete(entity)?;
                (concrete, self.entities.get_by_id((*concrete).type_id())?)
            }
            None => (entity, Arc::clone(metadata)),
        };

        let materialize_nulls = self.config().materialize_nulls;
        let mut elements = Vec::with_capacity(metadata.fields().len() + 1);
        for field in metadata.fields() {
            let value = FieldValue::read(entity, field)?;
            if value.is_not_empty() || materialize_nulls {
                // converters may still produce a null native value
                elements.extend(
                    value
                        .to_elements(self)?
                        .into_iter()
                        .filter(|element| materialize_nulls || !element.value.is_null()),
                );
            }
        }

        if let Some(inheritance) = metadata.inheritance() {
            elements.push(Element::new(
                inheritance.discriminator_column(),
                inheritance.discriminator_value(),
            ));
        }
        Ok((elements, metadata))
    }

    /// Rebuilds an entity of type `T` from a native record. Polymorphic
    /// parents are resolved to the variant named by the record's
    /// discriminator.
    pub fn to_entity<T: Entity>(&self, record: &Record) -> Result<T> {
        let metadata = self.entities.get::<T>()?;
        let entity = unbox::<T>(self.instantiate(&metadata, record.elements())?)?;
        self.events.fire_post_entity(&entity)?;
        Ok(entity)
    }

    /// Type-erased [`EntityConverter::to_entity`].
    pub fn to_entity_dyn(&self, type_ref: &TypeRef, record: &Record) -> Result<Box<dyn Any + Send>> {
        let metadata = self.entities.get_by_ref(type_ref)?;
        let entity = self.instantiate(&metadata, record.elements())?;
        self.events.fire_post_entity(&*entity)?;
        Ok(entity)
    }

    /// Rebuilds an entity of whichever loaded type is registered under the
    /// record's name.
    pub fn to_entity_by_name(&self, record: &Record) -> Result<Box<dyn Any + Send>> {
        let metadata = self.entities.find_by_name(record.name())?;
        let entity = self.instantiate(&metadata, record.elements())?;
        self.events.fire_post_entity(&*entity)?;
        Ok(entity)
    }

    /// Writes the record's values into an existing instance.
    pub fn to_entity_into<T: Entity>(&self, entity: &mut T, record: &Record) -> Result<()> {
        let metadata = self.entities.get::<T>()?;
        if metadata.is_inheritance() {
            return Err(MapperError::Mapping(format!(
                "Cannot fill polymorphic {} in place",
                metadata.type_name()
            )));
        }
        self.fill(entity, &metadata, record.elements())
    }

    /// Writes a store-assigned id into the entity's id field.
    pub fn feed_id<T: Entity>(&self, entity: &mut T, id: Value) -> Result<()> {
        let metadata = self.entities.get::<T>()?;
        let field = metadata.id().ok_or_else(|| {
            MapperError::Mapping(format!("{} declares no id field", metadata.type_name()))
        })?;
        self.write_native(entity, field, id)
    }

    fn instantiate(
        &self,
        metadata: &Arc<EntityMetadata>,
        elements: &[Element],
    ) -> Result<Box<dyn Any + Send>> {
        if let Some(polymorphic) = metadata.polymorphic() {
            let inheritance = self.resolve_variant(metadata, polymorphic, elements)?;
            let variant = self.entities.get_by_id(inheritance.entity())?;
            let instance = self.instantiate(&variant, elements)?;
            return inheritance.lift(instance);
        }

        if metadata.is_default_constructor() {
            let mut instance = metadata.new_instance()?;
            self.fill(&mut *instance, metadata, elements)?;
            Ok(instance)
        } else {
            self.construct(metadata, elements)
        }
    }

    /// Metadata of the concrete type `elements` rebuild into when read as a
    /// `metadata` entity.
    pub(crate) fn concrete_metadata(
        &self,
        metadata: &Arc<EntityMetadata>,
        elements: &[Element],
    ) -> Result<Arc<EntityMetadata>> {
        match metadata.polymorphic() {
            Some(polymorphic) => {
                let inheritance = self.resolve_variant(metadata, polymorphic, elements)?;
                self.entities.get_by_id(inheritance.entity())
            }
            None => Ok(Arc::clone(metadata)),
        }
    }

    fn resolve_variant(
        &self,
        metadata: &EntityMetadata,
        polymorphic: &PolymorphicMetadata,
        elements: &[Element],
    ) -> Result<InheritanceMetadata> {
        let group = self
            .entities
            .find_by_parent_group_by_discriminator_value(metadata.entity_type_id())?;
        if group.is_empty() {
            return Err(MapperError::Mapping(format!(
                "No variants are registered for {}",
                metadata.type_name()
            )));
        }

        let column = polymorphic.discriminator_column();
        let value = find(elements, column).ok_or_else(|| {
            MapperError::Mapping(format!(
                "Discriminator column '{}' is missing from the {} record",
                column,
                metadata.name()
            ))
        })?;
        let discriminator = match value {
            Value::Text(text) => text.clone(),
            other => other.to_string(),
        };

        let inheritance = group.get(&discriminator).cloned().ok_or_else(|| {
            MapperError::Mapping(format!(
                "No variant of {} is registered for discriminator '{}'",
                metadata.type_name(),
                discriminator
            ))
        })?;
        debug!(
            "Resolved discriminator '{}' of {} to {:?}",
            discriminator,
            metadata.type_name(),
            inheritance.entity
        );
        Ok(inheritance)
    }

    fn fill(
        &self,
        instance: &mut dyn Any,
        metadata: &EntityMetadata,
        elements: &[Element],
    ) -> Result<()> {
        for field in metadata.fields() {
            match field.kind() {
                MappingType::Embedded => {
                    // embedded values are flattened into the same elements
                    let embedded = self.entities.get_by_ref(element_type(field)?)?;
                    let child = self.instantiate(&embedded, elements)?;
                    field.write(instance, FieldInput::Object(child))?;
                }
                MappingType::Entity => match find(elements, field.name()) {
                    Some(Value::Record(nested)) => {
                        let entity = self.entities.get_by_ref(element_type(field)?)?;
                        let child = self.instantiate(&entity, nested)?;
                        field.write(instance, FieldInput::Object(child))?;
                    }
                    None | Some(Value::Null) => {}
                    Some(other) => return Err(shape_error(field, "a nested record", other)),
                },
                MappingType::Collection if field.is_embeddable() => {
                    match find(elements, field.name()) {
                        Some(Value::List(items)) => {
                            let entity = self.entities.get_by_ref(element_type(field)?)?;
                            let children = items
                                .iter()
                                .map(|item| match item {
                                    Value::Record(nested) => self.instantiate(&entity, nested),
                                    other => Err(shape_error(field, "a list of records", other)),
                                })
                                .collect::<Result<Vec<_>>>()?;
                            field.write(instance, FieldInput::Objects(children))?;
                        }
                        None | Some(Value::Null) => {}
                        Some(other) => return Err(shape_error(field, "a list of records", other)),
                    }
                }
                MappingType::Default | MappingType::Collection | MappingType::Map => {
                    if let Some(value) = find(elements, field.name()) {
                        self.write_native(instance, field, value.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_native(&self, instance: &mut dyn Any, field: &FieldMapping, value: Value) -> Result<()> {
        match field.converter() {
            Some(_) if value.is_null() => Ok(()),
            Some(reference) => {
                let attribute = self.converters.get(reference)?.to_attribute_dyn(value)?;
                field.write(instance, FieldInput::Attribute(attribute))
            }
            None => field.write(instance, FieldInput::Native(value)),
        }
    }

    fn construct(
        &self,
        metadata: &EntityMetadata,
        elements: &[Element],
    ) -> Result<Box<dyn Any + Send>> {
        let constructor = metadata.constructor().ok_or_else(|| {
            MapperError::Mapping(format!("{} has no constructor", metadata.type_name()))
        })?;

        let mut builder = ConstructorBuilder::of(constructor, metadata.type_name());
        for parameter in constructor.parameters() {
            let argument = match (find(elements, parameter.name()), parameter.converter()) {
                (None, _) => Argument::Empty,
                (Some(value), Some(reference)) if !value.is_null() => Argument::Attribute(
                    self.converters.get(reference)?.to_attribute_dyn(value.clone())?,
                ),
                (Some(value), _) => Argument::Value(value.clone()),
            };
            builder.add(argument)?;
        }
        builder.build()
    }
}

fn element_type(field: &FieldMapping) -> Result<&TypeRef> {
    field.element().ok_or_else(|| {
        MapperError::Mapping(format!(
            "Field '{}' declares no element type",
            field.field_name()
        ))
    })
}

fn shape_error(field: &FieldMapping, expected: &str, found: &Value) -> MapperError {
    MapperError::Mapping(format!(
        "Field '{}' expects {} under '{}', found {}",
        field.field_name(),
        expected,
        field.name(),
        found.type_name()
    ))
}
