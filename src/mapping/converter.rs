use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::core::{MapperError, Result, Value};

/// Bidirectional transform between an entity attribute and its stored form.
///
/// ```ignore
/// struct MoneyConverter;
///
/// impl AttributeConverter for MoneyConverter {
///     type Attribute = Money;
///
///     fn to_native(&self, money: &Money) -> Result<Value> {
///         Ok(Value::Text(format!("{} {}", money.currency, money.amount)))
///     }
///
///     fn to_attribute(&self, native: Value) -> Result<Money> {
///         Money::parse(native.as_str().unwrap_or_default())
///     }
/// }
/// ```
pub trait AttributeConverter: Send + Sync + 'static {
    type Attribute: Send + Sync + 'static;

    fn to_native(&self, attribute: &Self::Attribute) -> Result<Value>;

    fn to_attribute(&self, native: Value) -> Result<Self::Attribute>;
}

/// Object-safe face of an [`AttributeConverter`], used by the conversion engine.
pub trait ErasedConverter: Send + Sync {
    fn to_native_dyn(&self, attribute: &dyn Any) -> Result<Value>;

    fn to_attribute_dyn(&self, native: Value) -> Result<Box<dyn Any + Send>>;
}

impl<C: AttributeConverter> ErasedConverter for C {
    fn to_native_dyn(&self, attribute: &dyn Any) -> Result<Value> {
        let attribute = attribute.downcast_ref::<C::Attribute>().ok_or_else(|| {
            MapperError::Converter(format!(
                "{} expects attributes of type {}",
                type_name::<C>(),
                type_name::<C::Attribute>()
            ))
        })?;
        self.to_native(attribute)
    }

    fn to_attribute_dyn(&self, native: Value) -> Result<Box<dyn Any + Send>> {
        let attribute = self.to_attribute(native)?;
        Ok(Box::new(attribute))
    }
}

/// Reference from a field or constructor parameter to a converter type.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ConverterRef {
    type_id: TypeId,
    type_name: &'static str,
}

impl ConverterRef {
    pub fn of<C: AttributeConverter>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterRef({})", self.type_name)
    }
}

/// Registry of converter instances, keyed by converter type.
#[derive(Default)]
pub struct Converters {
    converters: RwLock<HashMap<TypeId, Arc<dyn ErasedConverter>>>,
}

impl Converters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: AttributeConverter>(&self, converter: C) -> Result<()> {
        let mut converters = self.converters.write()?;
        converters.insert(TypeId::of::<C>(), Arc::new(converter));
        Ok(())
    }

    pub fn with<C: AttributeConverter>(self, converter: C) -> Result<Self> {
        self.register(converter)?;
        Ok(self)
    }

    pub fn get(&self, reference: &ConverterRef) -> Result<Arc<dyn ErasedConverter>> {
        let converters = self.converters.read()?;
        converters.get(&reference.type_id).cloned().ok_or_else(|| {
            MapperError::Mapping(format!(
                "No attribute converter registered for {}",
                reference.type_name
            ))
        })
    }

    pub fn contains(&self, reference: &ConverterRef) -> bool {
        self.converters
            .read()
            .map(|converters| converters.contains_key(&reference.type_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.converters.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Celsius(f64);

    struct CelsiusConverter;

    impl AttributeConverter for CelsiusConverter {
        type Attribute = Celsius;

        fn to_native(&self, attribute: &Celsius) -> Result<Value> {
            Ok(Value::Text(format!("{}C", attribute.0)))
        }

        fn to_attribute(&self, native: Value) -> Result<Celsius> {
            let text = native
                .as_str()
                .ok_or_else(|| MapperError::Converter("expected text".to_string()))?;
            text.trim_end_matches('C')
                .parse()
                .map(Celsius)
                .map_err(|_| MapperError::Converter(format!("bad temperature {}", text)))
        }
    }

    #[test]
    fn test_registered_converter_round_trips() {
        let converters = Converters::new().with(CelsiusConverter).unwrap();
        let converter = converters.get(&ConverterRef::of::<CelsiusConverter>()).unwrap();

        let native = converter.to_native_dyn(&Celsius(21.5)).unwrap();
        assert_eq!(native, Value::Text("21.5C".into()));

        let attribute = converter.to_attribute_dyn(native).unwrap();
        let celsius = attribute.downcast::<Celsius>().unwrap();
        assert_eq!(celsius.0, 21.5);
    }

    #[test]
    fn test_unregistered_converter_is_a_mapping_error() {
        let converters = Converters::new();
        let err = converters
            .get(&ConverterRef::of::<CelsiusConverter>())
            .err()
            .unwrap();
        assert!(matches!(err, MapperError::Mapping(_)));
    }

    #[test]
    fn test_wrong_attribute_type_is_rejected() {
        let converters = Converters::new().with(CelsiusConverter).unwrap();
        let converter = converters.get(&ConverterRef::of::<CelsiusConverter>()).unwrap();
        assert!(converter.to_native_dyn(&"hot".to_string()).is_err());
    }
}
