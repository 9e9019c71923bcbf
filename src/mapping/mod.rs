pub mod class_converter;
pub mod constructor;
pub mod converter;
pub mod descriptor;
pub mod entities;
pub mod field;
pub mod metadata;
pub mod values;

pub use class_converter::ClassConverter;
pub use constructor::{Argument, Arguments, ConstructorBuilder, ConstructorMetadata, Parameter};
pub use converter::{AttributeConverter, ConverterRef, Converters, ErasedConverter};
pub use descriptor::{Column, DescriptorBuilder, Entity, EntityDescriptor, TypeRef};
pub use entities::EntitiesMetadata;
pub use field::{FieldInput, FieldMapping, FieldRef, MappingType};
pub use metadata::{EntityMetadata, InheritanceMetadata, NativeMapping, PolymorphicMetadata};
pub use values::{MappedValue, ValueShape, coerce_value};
