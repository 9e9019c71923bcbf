//! Static schema declarations for mapped types.
//!
//! A type becomes mappable by implementing [`Entity`] and returning an
//! [`EntityDescriptor`] that lists its fields with typed accessors. The
//! `#[derive(Entity)]` macro writes these declarations for plain structs;
//! polymorphic parents, constructor-built types and converted fields can be
//! declared by hand with the same builder.
//!
//! ```ignore
//! impl Entity for Worker {
//!     fn descriptor() -> EntityDescriptor {
//!         EntityDescriptor::builder::<Worker>("Worker")
//!             .with_default()
//!             .field(Column::new("name"), |w: &Worker| &w.name, |w, v| w.name = v)
//!             .embedded(Column::new("job"), |w: &Worker| &w.job, |w, v| w.job = v)
//!             .converted::<MoneyConverter, _, _>(
//!                 Column::new("salary").named("money"),
//!                 |w: &Worker| &w.salary,
//!                 |w, v| w.salary = v,
//!             )
//!             .build()
//!     }
//! }
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::Result;
use crate::mapping::constructor::{Arguments, ConstructorMetadata, Parameter};
use crate::mapping::converter::{AttributeConverter, ConverterRef};
use crate::mapping::field::{
    Coercion, FieldInput, FieldReader, FieldRef, FieldWriter, MappingType, downcast_mut,
    downcast_ref, reader_fn, unbox, unexpected_input, writer_fn,
};
use crate::mapping::values::{MappedValue, ValueShape, coerce_value};

/// A type with a static mapping schema.
pub trait Entity: Any + Send + Sync + Sized {
    fn descriptor() -> EntityDescriptor;
}

/// Identity of a mapped type together with the way to describe it.
#[derive(Clone, Copy)]
pub struct TypeRef {
    type_id: TypeId,
    type_name: &'static str,
    descriptor: fn() -> EntityDescriptor,
}

impl TypeRef {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            descriptor: T::descriptor,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn descriptor(&self) -> EntityDescriptor {
        (self.descriptor)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.type_name)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// Column declaration of one attribute.
///
/// Without an explicit name the native key is the attribute name, or the
/// configured id column for the id attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub(crate) field_name: String,
    pub(crate) name: Option<String>,
    pub(crate) id: bool,
}

impl Column {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            name: None,
            id: false,
        }
    }

    /// Marks the attribute as the entity id.
    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// Overrides the native key.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn is_id(&self) -> bool {
        self.id
    }
}

impl From<&str> for Column {
    fn from(field_name: &str) -> Self {
        Column::new(field_name)
    }
}

#[derive(Clone)]
pub(crate) struct FieldDescriptor {
    pub(crate) column: Column,
    pub(crate) kind: MappingType,
    pub(crate) converter: Option<ConverterRef>,
    pub(crate) element: Option<TypeRef>,
    pub(crate) coerce: Option<Coercion>,
    pub(crate) reader: FieldReader,
    pub(crate) writer: FieldWriter,
}

pub type InstanceSupplier = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;
pub type LiftFn = Arc<dyn Fn(Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>> + Send + Sync>;
pub type ConcreteFn = Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any> + Send + Sync>;

fn concrete_fn<F>(resolve: F) -> ConcreteFn
where
    F: for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(resolve)
}

#[derive(Clone)]
pub(crate) struct InheritanceDescriptor {
    pub(crate) value: String,
    pub(crate) parent: TypeRef,
    pub(crate) lift: LiftFn,
}

#[derive(Clone)]
pub(crate) struct PolymorphicDescriptor {
    pub(crate) column: Option<String>,
    pub(crate) as_concrete: ConcreteFn,
}

/// Declared schema of one mapped type.
#[derive(Clone)]
pub struct EntityDescriptor {
    pub(crate) name: String,
    pub(crate) type_ref: TypeRef,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) instance_supplier: Option<InstanceSupplier>,
    pub(crate) constructor: Option<ConstructorMetadata>,
    pub(crate) inheritance: Option<InheritanceDescriptor>,
    pub(crate) polymorphic: Option<PolymorphicDescriptor>,
    pub(crate) variants: Vec<TypeRef>,
}

impl EntityDescriptor {
    pub fn builder<E: Entity>(name: impl Into<String>) -> DescriptorBuilder<E> {
        DescriptorBuilder {
            descriptor: EntityDescriptor {
                name: name.into(),
                type_ref: TypeRef::of::<E>(),
                fields: Vec::new(),
                instance_supplier: None,
                constructor: None,
                inheritance: None,
                polymorphic: None,
                variants: Vec::new(),
            },
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|field| field.column.field_name.as_str())
            .collect()
    }

    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic.is_some()
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_ref)
            .field("fields", &self.field_names())
            .field("polymorphic", &self.is_polymorphic())
            .finish()
    }
}

pub struct DescriptorBuilder<E> {
    descriptor: EntityDescriptor,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> DescriptorBuilder<E> {
    /// Instances are created with `Default::default()` and then filled field by field.
    pub fn with_default(self) -> Self
    where
        E: Default,
    {
        self.instance_supplier(E::default)
    }

    pub fn instance_supplier<F>(mut self, supply: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.descriptor.instance_supplier =
            Some(Arc::new(move || Box::new(supply()) as Box<dyn Any + Send>));
        self
    }

    fn push(mut self, field: FieldDescriptor) -> Self {
        self.descriptor.fields.push(field);
        self
    }

    /// Plain attribute. Scalars map as `Default`, sequences and sets as
    /// `Collection`, string-keyed maps as `Map`.
    pub fn field<T, G, S>(self, column: impl Into<Column>, get: G, set: S) -> Self
    where
        T: MappedValue,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        let column = column.into();
        let kind = match T::SHAPE {
            ValueShape::Scalar => MappingType::Default,
            ValueShape::Collection => MappingType::Collection,
            ValueShape::Map => MappingType::Map,
        };
        let field_name = column.field_name.clone();

        let reader = reader_fn(move |instance| {
            let entity = downcast_ref::<E>(instance)?;
            get(entity).to_value().map(FieldRef::Native)
        });
        let writer = writer_fn(move |instance, input| {
            let entity = downcast_mut::<E>(instance)?;
            match input {
                FieldInput::Native(value) => {
                    set(entity, T::from_value(value)?);
                    Ok(())
                }
                other => Err(unexpected_input(&field_name, &other)),
            }
        });
        self.push(FieldDescriptor {
            column,
            kind,
            converter: None,
            element: None,
            coerce: Some(coerce_value::<T> as Coercion),
            reader,
            writer,
        })
    }

    /// Attribute stored through the attribute converter `C`.
    pub fn converted<C, G, S>(self, column: impl Into<Column>, get: G, set: S) -> Self
    where
        C: AttributeConverter,
        G: Fn(&E) -> &C::Attribute + Send + Sync + 'static,
        S: Fn(&mut E, C::Attribute) + Send + Sync + 'static,
    {
        let column = column.into();
        let field_name = column.field_name.clone();

        let reader = reader_fn(move |instance| {
            let entity = downcast_ref::<E>(instance)?;
            Ok(FieldRef::Attribute(get(entity) as &dyn Any))
        });
        let writer = writer_fn(move |instance, input| {
            let entity = downcast_mut::<E>(instance)?;
            match input {
                FieldInput::Attribute(boxed) => {
                    set(entity, unbox::<C::Attribute>(boxed)?);
                    Ok(())
                }
                other => Err(unexpected_input(&field_name, &other)),
            }
        });
        self.push(FieldDescriptor {
            column,
            kind: MappingType::Default,
            converter: Some(ConverterRef::of::<C>()),
            element: None,
            coerce: None,
            reader,
            writer,
        })
    }

    fn nested<T, G, S>(self, column: Column, kind: MappingType, get: G, set: S) -> Self
    where
        T: Entity,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        let field_name = column.field_name.clone();

        let reader = reader_fn(move |instance| {
            let entity = downcast_ref::<E>(instance)?;
            Ok(FieldRef::Object(get(entity) as &dyn Any))
        });
        let writer = writer_fn(move |instance, input| {
            let entity = downcast_mut::<E>(instance)?;
            match input {
                FieldInput::Object(boxed) => {
                    set(entity, unbox::<T>(boxed)?);
                    Ok(())
                }
                other => Err(unexpected_input(&field_name, &other)),
            }
        });
        self.push(FieldDescriptor {
            column,
            kind,
            converter: None,
            element: Some(TypeRef::of::<T>()),
            coerce: None,
            reader,
            writer,
        })
    }

    /// Value object whose fields are flattened into this entity's record.
    pub fn embedded<T, G, S>(self, column: impl Into<Column>, get: G, set: S) -> Self
    where
        T: Entity,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        self.nested(column.into(), MappingType::Embedded, get, set)
    }

    /// Sub-entity stored as a single nested record.
    pub fn entity<T, G, S>(self, column: impl Into<Column>, get: G, set: S) -> Self
    where
        T: Entity,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        S: Fn(&mut E, T) + Send + Sync + 'static,
    {
        self.nested(column.into(), MappingType::Entity, get, set)
    }

    /// Ordered collection of entities, stored as a list of nested records.
    pub fn embeddables<T, G, S>(self, column: impl Into<Column>, get: G, set: S) -> Self
    where
        T: Entity,
        G: Fn(&E) -> &Vec<T> + Send + Sync + 'static,
        S: Fn(&mut E, Vec<T>) + Send + Sync + 'static,
    {
        let column = column.into();
        let field_name = column.field_name.clone();

        let reader = reader_fn(move |instance| {
            let entity = downcast_ref::<E>(instance)?;
            Ok(FieldRef::Objects(
                get(entity).iter().map(|item| item as &dyn Any).collect(),
            ))
        });
        let writer = writer_fn(move |instance, input| {
            let entity = downcast_mut::<E>(instance)?;
            match input {
                FieldInput::Objects(items) => {
                    let items = items
                        .into_iter()
                        .map(unbox::<T>)
                        .collect::<Result<Vec<T>>>()?;
                    set(entity, items);
                    Ok(())
                }
                other => Err(unexpected_input(&field_name, &other)),
            }
        });
        self.push(FieldDescriptor {
            column,
            kind: MappingType::Collection,
            converter: None,
            element: Some(TypeRef::of::<T>()),
            coerce: None,
            reader,
            writer,
        })
    }

    /// Builds instances through a parameterized constructor instead of the
    /// instance supplier. Parameters are resolved by native key.
    pub fn constructor<F>(mut self, parameters: Vec<Parameter>, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<E> + Send + Sync + 'static,
    {
        self.descriptor.constructor = Some(ConstructorMetadata {
            parameters,
            build: Arc::new(move |arguments: &mut Arguments| {
                build(arguments).map(|entity| Box::new(entity) as Box<dyn Any + Send>)
            }),
        });
        self
    }

    /// Declares this type as the variant of polymorphic parent `P` stored
    /// with discriminator `value`. `lift` wraps a variant into its parent.
    pub fn inherits<P, F>(mut self, value: impl Into<String>, lift: F) -> Self
    where
        P: Entity,
        F: Fn(E) -> P + Send + Sync + 'static,
    {
        self.descriptor.inheritance = Some(InheritanceDescriptor {
            value: value.into(),
            parent: TypeRef::of::<P>(),
            lift: Arc::new(move |boxed: Box<dyn Any + Send>| {
                let child = unbox::<E>(boxed)?;
                Ok(Box::new(lift(child)) as Box<dyn Any + Send>)
            }),
        });
        self
    }

    /// Declares this type as a polymorphic parent. Records carry a
    /// discriminator in `column`, or the configured default column.
    /// `as_concrete` exposes the variant held by an instance.
    pub fn polymorphic<F>(mut self, column: Option<&str>, as_concrete: F) -> Self
    where
        F: for<'a> Fn(&'a E) -> &'a (dyn Any + 'static),
        F: Send + Sync + 'static,
    {
        self.descriptor.polymorphic = Some(PolymorphicDescriptor {
            column: column.map(str::to_string),
            as_concrete: concrete_fn(move |instance| {
                let entity = downcast_ref::<E>(instance)?;
                Ok(as_concrete(entity))
            }),
        });
        self
    }

    /// Registers a variant of this polymorphic parent.
    pub fn variant<C: Entity>(mut self) -> Self {
        self.descriptor.variants.push(TypeRef::of::<C>());
        self
    }

    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}
