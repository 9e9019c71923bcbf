//! Conversions between plain Rust field types and native values.
//!
//! `from_value` is the generic coercion used when a record is read back into
//! an entity and when query parameters are normalized: a `"20"` text becomes
//! `20` for an integer field, a single scalar becomes a one-element list.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::{Element, MapperError, Result, Value};

/// Native shape of a plain field, which decides its mapping kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Collection,
    Map,
}

pub trait MappedValue: Sized + Send + Sync + 'static {
    const SHAPE: ValueShape = ValueShape::Scalar;

    fn to_value(&self) -> Result<Value>;

    fn from_value(value: Value) -> Result<Self>;
}

/// Normalizes a native value to the representation `T` would store.
pub fn coerce_value<T: MappedValue>(value: Value) -> Result<Value> {
    T::from_value(value)?.to_value()
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    Err(MapperError::TypeMismatch(format!(
        "Cannot convert {} value '{}' to {}",
        value.type_name(),
        value,
        target
    )))
}

impl MappedValue for Value {
    fn to_value(&self) -> Result<Value> {
        Ok(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl MappedValue for i64 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Integer(i) => Ok(*i),
            Value::Float(_) => value
                .as_i64()
                .map_or_else(|| mismatch(&value, "i64"), Ok),
            Value::Text(s) => s.trim().parse().or_else(|_| mismatch(&value, "i64")),
            Value::Boolean(b) => Ok(i64::from(*b)),
            _ => mismatch(&value, "i64"),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),+) => {
        $(
            impl MappedValue for $ty {
                fn to_value(&self) -> Result<Value> {
                    i64::try_from(*self).map(Value::Integer).map_err(|_| {
                        MapperError::TypeMismatch(format!(
                            "{} value {} does not fit a native INTEGER",
                            stringify!($ty),
                            self
                        ))
                    })
                }

                fn from_value(value: Value) -> Result<Self> {
                    let wide = i64::from_value(value.clone())?;
                    <$ty>::try_from(wide).or_else(|_| mismatch(&value, stringify!($ty)))
                }
            }
        )+
    };
}

narrow_integer!(i32, u32, u64, usize);

impl MappedValue for f64 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::Text(s) => s.trim().parse().or_else(|_| mismatch(&value, "f64")),
            _ => mismatch(&value, "f64"),
        }
    }
}

impl MappedValue for f32 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl MappedValue for bool {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Boolean(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => mismatch(&value, "bool"),
            },
            _ => mismatch(&value, "bool"),
        }
    }
}

impl MappedValue for String {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other @ (Value::Null | Value::List(_) | Value::Record(_)) => mismatch(&other, "String"),
            other => Ok(other.to_string()),
        }
    }
}

impl MappedValue for Uuid {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Uuid(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).or_else(|_| mismatch(&value, "Uuid")),
            _ => mismatch(&value, "Uuid"),
        }
    }
}

impl MappedValue for DateTime<Utc> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| mismatch(&value, "DateTime<Utc>")),
            _ => mismatch(&value, "DateTime<Utc>"),
        }
    }
}

impl MappedValue for NaiveDate {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Date(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date_naive()),
            Value::Text(s) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").or_else(|_| mismatch(&value, "NaiveDate"))
            }
            _ => mismatch(&value, "NaiveDate"),
        }
    }
}

impl<T: MappedValue> MappedValue for Option<T> {
    const SHAPE: ValueShape = T::SHAPE;

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn list_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(values) => values,
        Value::Null => Vec::new(),
        single => vec![single],
    }
}

impl<T: MappedValue> MappedValue for Vec<T> {
    const SHAPE: ValueShape = ValueShape::Collection;

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(MappedValue::to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self> {
        list_items(value).into_iter().map(T::from_value).collect()
    }
}

impl<T: MappedValue + Ord> MappedValue for BTreeSet<T> {
    const SHAPE: ValueShape = ValueShape::Collection;

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(MappedValue::to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self> {
        list_items(value).into_iter().map(T::from_value).collect()
    }
}

impl<T: MappedValue + Eq + Hash> MappedValue for HashSet<T> {
    const SHAPE: ValueShape = ValueShape::Collection;

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(MappedValue::to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self> {
        list_items(value).into_iter().map(T::from_value).collect()
    }
}

fn map_entries(value: Value) -> Result<Vec<Element>> {
    match value {
        Value::Record(elements) => Ok(elements),
        Value::Null => Ok(Vec::new()),
        other => mismatch(&other, "map"),
    }
}

impl<T: MappedValue> MappedValue for BTreeMap<String, T> {
    const SHAPE: ValueShape = ValueShape::Map;

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(key, value)| -> Result<Element> {
                Ok(Element::new(key.clone(), value.to_value()?))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Record)
    }

    fn from_value(value: Value) -> Result<Self> {
        map_entries(value)?
            .into_iter()
            .map(|element| -> Result<(String, T)> {
                Ok((element.key, T::from_value(element.value)?))
            })
            .collect()
    }
}

impl<T: MappedValue> MappedValue for HashMap<String, T> {
    const SHAPE: ValueShape = ValueShape::Map;

    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(key, value)| -> Result<Element> {
                Ok(Element::new(key.clone(), value.to_value()?))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Record)
    }

    fn from_value(value: Value) -> Result<Self> {
        map_entries(value)?
            .into_iter()
            .map(|element| -> Result<(String, T)> {
                Ok((element.key, T::from_value(element.value)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion_from_text() {
        assert_eq!(i64::from_value(Value::Text("20".into())).unwrap(), 20);
        assert_eq!(coerce_value::<i64>(Value::Text("20".into())).unwrap(), Value::Integer(20));
        assert!(i64::from_value(Value::Text("twenty".into())).is_err());
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
    }

    #[test]
    fn test_unsigned_values_beyond_i64_are_rejected() {
        assert!(matches!(u64::MAX.to_value(), Err(MapperError::TypeMismatch(_))));
        assert!(usize::MAX.to_value().is_err());
        assert_eq!((i64::MAX as u64).to_value().unwrap(), Value::Integer(i64::MAX));
        assert!(u64::from_value(Value::Integer(-1)).is_err());
    }

    #[test]
    fn test_string_accepts_scalars() {
        assert_eq!(String::from_value(Value::Integer(10)).unwrap(), "10");
        assert!(String::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Integer(3)).unwrap(), Some(3));
        assert_eq!(None::<String>.to_value().unwrap(), Value::Null);
    }

    #[test]
    fn test_collections_wrap_single_values() {
        let set = BTreeSet::<i64>::from_value(Value::Text("123".into())).unwrap();
        assert_eq!(set, BTreeSet::from([123]));

        let list = Vec::<String>::from_value(Value::List(vec![
            Value::Text("a".into()),
            Value::Text("b".into()),
        ]))
        .unwrap();
        assert_eq!(list, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(Vec::<String>::SHAPE, ValueShape::Collection);
    }

    #[test]
    fn test_map_round_trip_through_record() {
        let mut phones = BTreeMap::new();
        phones.insert("home".to_string(), "555-0100".to_string());
        let value = phones.to_value().unwrap();
        assert!(matches!(value, Value::Record(_)));
        assert_eq!(BTreeMap::<String, String>::from_value(value).unwrap(), phones);
        assert_eq!(BTreeMap::<String, String>::SHAPE, ValueShape::Map);
    }

    #[test]
    fn test_temporal_values_parse_text() {
        let date = NaiveDate::from_value(Value::Text("2024-02-29".into())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(Uuid::from_value(Value::Text("not-a-uuid".into())).is_err());
    }
}
