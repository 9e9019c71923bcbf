use std::any::Any;

use crate::convert::entity_converter::EntityConverter;
use crate::core::{Element, MapperError, Result, Value};
use crate::mapping::{FieldMapping, FieldRef, MappingType, TypeRef};

/// The value one field holds on one instance, ready to become native
/// elements.
pub struct FieldValue<'a> {
    field: &'a FieldMapping,
    value: FieldRef<'a>,
}

impl<'a> FieldValue<'a> {
    pub fn of(value: FieldRef<'a>, field: &'a FieldMapping) -> Self {
        Self { field, value }
    }

    /// Reads `field` from `instance`.
    pub fn read(instance: &'a dyn Any, field: &'a FieldMapping) -> Result<Self> {
        Ok(Self::of(field.read(instance)?, field))
    }

    pub fn field(&self) -> &FieldMapping {
        self.field
    }

    pub fn value(&self) -> &FieldRef<'a> {
        &self.value
    }

    /// False when the field holds a null native value.
    pub fn is_not_empty(&self) -> bool {
        !matches!(self.value, FieldRef::Native(Value::Null))
    }

    pub fn is_id(&self) -> bool {
        self.field.is_id()
    }

    /// Native elements for this field. Embedded fields yield the elements of
    /// the nested object, every other kind yields exactly one element.
    pub fn to_elements(&self, converter: &EntityConverter) -> Result<Vec<Element>> {
        let name = self.field.name();
        match (self.field.kind(), &self.value) {
            (MappingType::Embedded, FieldRef::Object(object)) => {
                converter.to_elements(*object, self.element_type()?)
            }
            (MappingType::Entity, FieldRef::Object(object)) => {
                let elements = converter.to_elements(*object, self.element_type()?)?;
                Ok(vec![Element::new(name, Value::Record(elements))])
            }
            (MappingType::Collection, FieldRef::Objects(objects)) => {
                let element_type = self.element_type()?;
                let records = objects
                    .iter()
                    .map(|object| converter.to_elements(*object, element_type).map(Value::Record))
                    .collect::<Result<Vec<_>>>()?;
                Ok(vec![Element::new(name, Value::List(records))])
            }
            (
                MappingType::Default | MappingType::Collection | MappingType::Map,
                FieldRef::Attribute(attribute),
            ) => {
                let reference = self.field.converter().ok_or_else(|| {
                    MapperError::Mapping(format!(
                        "Field '{}' holds an attribute but declares no converter",
                        self.field.field_name()
                    ))
                })?;
                let native = converter.converters().get(reference)?.to_native_dyn(*attribute)?;
                Ok(vec![Element::new(name, native)])
            }
            (
                MappingType::Default | MappingType::Collection | MappingType::Map,
                FieldRef::Native(value),
            ) => Ok(vec![Element::new(name, value.clone())]),
            (kind, _) => Err(MapperError::Mapping(format!(
                "Field '{}' of kind {:?} produced a value of another shape",
                self.field.field_name(),
                kind
            ))),
        }
    }

    fn element_type(&self) -> Result<&TypeRef> {
        self.field.element().ok_or_else(|| {
            MapperError::Mapping(format!(
                "Field '{}' declares no element type",
                self.field.field_name()
            ))
        })
    }
}
