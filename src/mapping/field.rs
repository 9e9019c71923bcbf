use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::core::{MapperError, Result, Value};
use crate::mapping::converter::ConverterRef;
use crate::mapping::descriptor::TypeRef;

/// How a field is laid out in the native record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingType {
    /// A plain value stored under its own key.
    Default,
    /// A value object whose keys are spliced into the owning record.
    Embedded,
    /// A sub-entity stored as one nested record.
    Entity,
    Collection,
    Map,
}

/// What a field reader hands back for one instance.
pub enum FieldRef<'a> {
    /// Plain value already in native form.
    Native(Value),
    /// Attribute that must go through the field's converter.
    Attribute(&'a dyn Any),
    /// Nested embedded or sub-entity object.
    Object(&'a dyn Any),
    /// Elements of an embeddable collection, in source order.
    Objects(Vec<&'a dyn Any>),
}

/// What a field writer accepts, mirroring [`FieldRef`] with owned values.
pub enum FieldInput {
    Native(Value),
    Attribute(Box<dyn Any + Send>),
    Object(Box<dyn Any + Send>),
    Objects(Vec<Box<dyn Any + Send>>),
}

impl FieldInput {
    fn variant_name(&self) -> &'static str {
        match self {
            FieldInput::Native(_) => "native value",
            FieldInput::Attribute(_) => "converted attribute",
            FieldInput::Object(_) => "object",
            FieldInput::Objects(_) => "object list",
        }
    }
}

pub type FieldReader = Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<FieldRef<'a>> + Send + Sync>;
pub type FieldWriter = Arc<dyn Fn(&mut dyn Any, FieldInput) -> Result<()> + Send + Sync>;
pub type Coercion = fn(Value) -> Result<Value>;

pub(crate) fn reader_fn<F>(read: F) -> FieldReader
where
    F: for<'a> Fn(&'a dyn Any) -> Result<FieldRef<'a>> + Send + Sync + 'static,
{
    Arc::new(read)
}

pub(crate) fn writer_fn<F>(write: F) -> FieldWriter
where
    F: Fn(&mut dyn Any, FieldInput) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(write)
}

pub(crate) fn downcast_ref<E: Any>(instance: &dyn Any) -> Result<&E> {
    instance.downcast_ref::<E>().ok_or_else(|| {
        MapperError::Mapping(format!("Expected an instance of {}", type_name::<E>()))
    })
}

pub(crate) fn downcast_mut<E: Any>(instance: &mut dyn Any) -> Result<&mut E> {
    instance.downcast_mut::<E>().ok_or_else(|| {
        MapperError::Mapping(format!("Expected an instance of {}", type_name::<E>()))
    })
}

pub(crate) fn unbox<T: Any>(boxed: Box<dyn Any + Send>) -> Result<T> {
    boxed.downcast::<T>().map(|value| *value).map_err(|_| {
        MapperError::Mapping(format!("Expected a value of type {}", type_name::<T>()))
    })
}

pub(crate) fn unexpected_input(field: &str, input: &FieldInput) -> MapperError {
    MapperError::Mapping(format!(
        "Field '{}' cannot be written from a {}",
        field,
        input.variant_name()
    ))
}

/// Mapping of one declared attribute to its native key.
#[derive(Clone)]
pub struct FieldMapping {
    pub(crate) name: String,
    pub(crate) field_name: String,
    pub(crate) kind: MappingType,
    pub(crate) id: bool,
    pub(crate) converter: Option<ConverterRef>,
    pub(crate) element: Option<TypeRef>,
    pub(crate) coerce: Option<Coercion>,
    pub(crate) reader: FieldReader,
    pub(crate) writer: FieldWriter,
}

impl FieldMapping {
    /// Native key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute name on the Rust type.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> MappingType {
        self.kind
    }

    pub fn is_id(&self) -> bool {
        self.id
    }

    pub fn converter(&self) -> Option<&ConverterRef> {
        self.converter.as_ref()
    }

    /// Entity type behind an embedded, sub-entity or embeddable collection field.
    pub fn element(&self) -> Option<&TypeRef> {
        self.element.as_ref()
    }

    /// True for a collection whose elements are entities themselves.
    pub fn is_embeddable(&self) -> bool {
        self.kind == MappingType::Collection && self.element.is_some()
    }

    pub fn read<'a>(&self, instance: &'a dyn Any) -> Result<FieldRef<'a>> {
        (self.reader)(instance)
    }

    pub fn write(&self, instance: &mut dyn Any, input: FieldInput) -> Result<()> {
        (self.writer)(instance, input)
    }

    /// Normalizes a native value to what this field stores. Fields without a
    /// declared value type pass values through.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match self.coerce {
            Some(coerce) => coerce(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("name", &self.name)
            .field("field_name", &self.field_name)
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("converter", &self.converter)
            .field("element", &self.element)
            .finish()
    }
}

impl PartialEq for FieldMapping {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.field_name == other.field_name
            && self.kind == other.kind
            && self.id == other.id
            && self.converter == other.converter
            && self.element.map(|e| e.type_id()) == other.element.map(|e| e.type_id())
    }
}
