//! Parameterized construction of entities from native records.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::core::{MapperError, Result, Value};
use crate::mapping::converter::{AttributeConverter, ConverterRef};
use crate::mapping::field::unbox;
use crate::mapping::values::MappedValue;

/// One constructor parameter, resolved by native key.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) converter: Option<ConverterRef>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            converter: None,
        }
    }

    /// Parameter whose native value goes through `C` before construction.
    pub fn converted<C: AttributeConverter>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            converter: Some(ConverterRef::of::<C>()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn converter(&self) -> Option<&ConverterRef> {
        self.converter.as_ref()
    }
}

/// A resolved constructor argument.
///
/// `Empty` marks a parameter whose key was absent from the record. It is
/// never turned into a default value: required parameters fail with a
/// mapping error, optional ones become `None`.
pub enum Argument {
    Value(Value),
    Attribute(Box<dyn Any + Send>),
    Empty,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => write!(f, "Value({})", value),
            Argument::Attribute(_) => write!(f, "Attribute(..)"),
            Argument::Empty => write!(f, "Empty"),
        }
    }
}

/// Arguments handed to a constructor function, keyed by parameter name.
#[derive(Debug, Default)]
pub struct Arguments {
    entity: &'static str,
    values: Vec<(String, Argument)>,
}

impl Arguments {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            entity,
            values: Vec::new(),
        }
    }

    fn take(&mut self, name: &str) -> Result<Argument> {
        let slot = self
            .values
            .iter_mut()
            .find(|(key, _)| key == name)
            .ok_or_else(|| {
                MapperError::Mapping(format!(
                    "{} has no constructor parameter named '{}'",
                    self.entity, name
                ))
            })?;
        Ok(std::mem::replace(&mut slot.1, Argument::Empty))
    }

    fn missing(&self, name: &str) -> MapperError {
        MapperError::Mapping(format!(
            "Missing value for required constructor parameter '{}' of {}",
            name, self.entity
        ))
    }

    /// Takes a plain parameter, coercing the native value to `T`.
    pub fn get<T: MappedValue>(&mut self, name: &str) -> Result<T> {
        match self.take(name)? {
            Argument::Value(value) => T::from_value(value),
            Argument::Attribute(boxed) => unbox(boxed),
            Argument::Empty => Err(self.missing(name)),
        }
    }

    /// Like [`Arguments::get`], but an absent or null value yields `None`.
    pub fn optional<T: MappedValue>(&mut self, name: &str) -> Result<Option<T>> {
        match self.take(name)? {
            Argument::Value(Value::Null) | Argument::Empty => Ok(None),
            Argument::Value(value) => T::from_value(value).map(Some),
            Argument::Attribute(boxed) => unbox(boxed).map(Some),
        }
    }

    /// Takes a parameter produced by an attribute converter.
    pub fn attribute<A: Any>(&mut self, name: &str) -> Result<A> {
        match self.take(name)? {
            Argument::Attribute(boxed) => unbox(boxed),
            Argument::Value(value) => Err(MapperError::Mapping(format!(
                "Parameter '{}' holds native value {} instead of a {}",
                name,
                value,
                type_name::<A>()
            ))),
            Argument::Empty => Err(self.missing(name)),
        }
    }

    pub fn is_empty(&self, name: &str) -> bool {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .is_none_or(|(_, argument)| matches!(argument, Argument::Empty))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

pub type ConstructorFn = Arc<dyn Fn(&mut Arguments) -> Result<Box<dyn Any + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct ConstructorMetadata {
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) build: ConstructorFn,
}

impl ConstructorMetadata {
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// A constructor without parameters behaves like the instance supplier.
    pub fn is_default(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl fmt::Debug for ConstructorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorMetadata")
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Collects arguments in parameter order and runs the constructor.
pub struct ConstructorBuilder<'m> {
    metadata: &'m ConstructorMetadata,
    arguments: Arguments,
}

impl<'m> ConstructorBuilder<'m> {
    pub fn of(metadata: &'m ConstructorMetadata, entity: &'static str) -> Self {
        Self {
            metadata,
            arguments: Arguments::new(entity),
        }
    }

    pub fn parameters(&self) -> &'m [Parameter] {
        &self.metadata.parameters
    }

    fn next_name(&self) -> Result<String> {
        self.metadata
            .parameters
            .get(self.arguments.len())
            .map(|parameter| parameter.name.clone())
            .ok_or_else(|| {
                MapperError::Mapping(format!(
                    "{} takes only {} constructor arguments",
                    self.arguments.entity,
                    self.metadata.parameters.len()
                ))
            })
    }

    pub fn add(&mut self, argument: Argument) -> Result<()> {
        let name = self.next_name()?;
        self.arguments.values.push((name, argument));
        Ok(())
    }

    pub fn add_empty_parameter(&mut self) -> Result<()> {
        self.add(Argument::Empty)
    }

    pub fn build(mut self) -> Result<Box<dyn Any + Send>> {
        while self.arguments.len() < self.metadata.parameters.len() {
            self.add_empty_parameter()?;
        }
        (self.metadata.build)(&mut self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Book {
        title: String,
        pages: i32,
        subtitle: Option<String>,
    }

    fn book_constructor() -> ConstructorMetadata {
        ConstructorMetadata {
            parameters: vec![
                Parameter::new("title"),
                Parameter::new("pages"),
                Parameter::new("subtitle"),
            ],
            build: Arc::new(|args: &mut Arguments| {
                let book = Book {
                    title: args.get("title")?,
                    pages: args.get("pages")?,
                    subtitle: args.optional("subtitle")?,
                };
                Ok(Box::new(book) as Box<dyn Any + Send>)
            }),
        }
    }

    #[test]
    fn test_builder_passes_arguments_in_order() {
        let metadata = book_constructor();
        let mut builder = ConstructorBuilder::of(&metadata, "Book");
        builder.add(Argument::Value(Value::Text("Dune".into()))).unwrap();
        builder.add(Argument::Value(Value::Text("412".into()))).unwrap();
        builder.add_empty_parameter().unwrap();

        let book = builder.build().unwrap().downcast::<Book>().unwrap();
        assert_eq!(
            *book,
            Book {
                title: "Dune".into(),
                pages: 412,
                subtitle: None
            }
        );
    }

    #[test]
    fn test_missing_required_parameter_fails() {
        let metadata = book_constructor();
        let mut builder = ConstructorBuilder::of(&metadata, "Book");
        builder.add(Argument::Value(Value::Text("Dune".into()))).unwrap();

        let err = builder.build().err().unwrap();
        assert!(matches!(err, MapperError::Mapping(msg) if msg.contains("pages")));
    }

    #[test]
    fn test_too_many_arguments_fail() {
        let metadata = ConstructorMetadata {
            parameters: vec![],
            build: Arc::new(|_: &mut Arguments| Ok(Box::new(()) as Box<dyn Any + Send>)),
        };
        assert!(metadata.is_default());
        let mut builder = ConstructorBuilder::of(&metadata, "Unit");
        assert!(builder.add(Argument::Empty).is_err());
    }
}
