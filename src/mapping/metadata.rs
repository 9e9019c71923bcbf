use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::core::{MapperError, Result};
use crate::mapping::constructor::ConstructorMetadata;
use crate::mapping::descriptor::{ConcreteFn, InstanceSupplier, LiftFn, TypeRef};
use crate::mapping::field::FieldMapping;

/// Where a dotted attribute path lands in the native record.
#[derive(Debug, Clone)]
pub struct NativeMapping {
    pub(crate) native_field: String,
    pub(crate) field: Arc<FieldMapping>,
}

impl NativeMapping {
    /// Native path, or a comma-joined list of paths for composite attributes.
    pub fn native_field(&self) -> &str {
        &self.native_field
    }

    /// The mapping of the attribute the path ends on.
    pub fn field(&self) -> &FieldMapping {
        &self.field
    }
}

/// Discriminator binding of a variant to its polymorphic parent.
#[derive(Clone)]
pub struct InheritanceMetadata {
    pub(crate) discriminator_column: String,
    pub(crate) discriminator_value: String,
    pub(crate) parent: TypeId,
    pub(crate) entity: TypeRef,
    pub(crate) lift: LiftFn,
}

impl InheritanceMetadata {
    pub fn discriminator_column(&self) -> &str {
        &self.discriminator_column
    }

    pub fn discriminator_value(&self) -> &str {
        &self.discriminator_value
    }

    pub fn parent(&self) -> TypeId {
        self.parent
    }

    pub fn entity(&self) -> TypeId {
        self.entity.type_id()
    }

    /// Wraps a boxed variant into a boxed parent.
    pub fn lift(&self, child: Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>> {
        (self.lift)(child)
    }
}

impl fmt::Debug for InheritanceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InheritanceMetadata")
            .field("discriminator_column", &self.discriminator_column)
            .field("discriminator_value", &self.discriminator_value)
            .field("entity", &self.entity)
            .finish()
    }
}

#[derive(Clone)]
pub struct PolymorphicMetadata {
    pub(crate) discriminator_column: String,
    pub(crate) as_concrete: ConcreteFn,
    pub(crate) variants: Vec<TypeRef>,
}

impl PolymorphicMetadata {
    pub fn discriminator_column(&self) -> &str {
        &self.discriminator_column
    }

    pub fn variants(&self) -> &[TypeRef] {
        &self.variants
    }

    /// The variant object held by a parent instance.
    pub fn as_concrete<'a>(&self, instance: &'a dyn Any) -> Result<&'a dyn Any> {
        (self.as_concrete)(instance)
    }
}

impl fmt::Debug for PolymorphicMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolymorphicMetadata")
            .field("discriminator_column", &self.discriminator_column)
            .field("variants", &self.variants)
            .finish()
    }
}

/// Mapping metadata of one entity type, built once and shared.
pub struct EntityMetadata {
    pub(crate) name: String,
    pub(crate) type_ref: TypeRef,
    pub(crate) fields: Vec<Arc<FieldMapping>>,
    pub(crate) fields_by_name: HashMap<String, Arc<FieldMapping>>,
    pub(crate) native_paths: BTreeMap<String, NativeMapping>,
    pub(crate) instance_supplier: Option<InstanceSupplier>,
    pub(crate) constructor: Option<ConstructorMetadata>,
    pub(crate) inheritance: Option<InheritanceMetadata>,
    pub(crate) polymorphic: Option<PolymorphicMetadata>,
}

impl EntityMetadata {
    /// Native record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type_id(&self) -> TypeId {
        self.type_ref.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_ref.type_name()
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn fields(&self) -> &[Arc<FieldMapping>] {
        &self.fields
    }

    /// Field stored under the native key `name`.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldMapping>> {
        self.fields_by_name.get(name)
    }

    /// Attribute names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.field_name()).collect()
    }

    pub fn id(&self) -> Option<&Arc<FieldMapping>> {
        self.fields.iter().find(|field| field.is_id())
    }

    pub fn native_paths(&self) -> &BTreeMap<String, NativeMapping> {
        &self.native_paths
    }

    pub fn find_native(&self, path: &str) -> Option<&NativeMapping> {
        self.native_paths.get(path)
    }

    /// Resolves a dotted attribute path to its native path. Unknown paths are
    /// returned unchanged.
    pub fn column_field(&self, path: &str) -> String {
        self.native_paths
            .get(path)
            .map(|mapping| mapping.native_field.clone())
            .unwrap_or_else(|| path.to_string())
    }

    pub fn constructor(&self) -> Option<&ConstructorMetadata> {
        self.constructor.as_ref()
    }

    /// True when instances come from the instance supplier and are then filled
    /// field by field.
    pub fn is_default_constructor(&self) -> bool {
        self.constructor.as_ref().is_none_or(ConstructorMetadata::is_default)
            && self.instance_supplier.is_some()
    }

    pub fn new_instance(&self) -> Result<Box<dyn Any + Send>> {
        match &self.instance_supplier {
            Some(supply) => Ok(supply()),
            None => Err(MapperError::Mapping(format!(
                "{} has no instance supplier",
                self.type_name()
            ))),
        }
    }

    pub fn inheritance(&self) -> Option<&InheritanceMetadata> {
        self.inheritance.as_ref()
    }

    pub fn polymorphic(&self) -> Option<&PolymorphicMetadata> {
        self.polymorphic.as_ref()
    }

    /// True for a polymorphic parent resolved through a discriminator.
    pub fn is_inheritance(&self) -> bool {
        self.polymorphic.is_some()
    }
}

impl fmt::Debug for EntityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("name", &self.name)
            .field("type", &self.type_ref)
            .field("fields", &self.fields)
            .field("constructor", &self.constructor)
            .field("inheritance", &self.inheritance)
            .field("polymorphic", &self.polymorphic)
            .finish()
    }
}
