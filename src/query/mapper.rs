//! Fluent queries written against entity attribute paths.
//!
//! Paths are resolved through the metadata's native path index, so
//! `where_("job.city")` on a type embedding `job` filters on `city`. Values
//! go through the attribute converter of the target field, or are coerced to
//! the field's declared type, so `where_("id").eq("20")` compares against
//! the integer `20` when `id` is an `i64`.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::{MapperError, Result, Value};
use crate::mapping::{Converters, EntityMetadata, FieldMapping, MappingType};
use crate::query::condition::{Condition, DeleteQuery, Operator, SelectQuery, Sort};

/// A query parameter: a native value or an attribute that needs conversion.
pub enum QueryArg {
    Native(Value),
    Attribute(Box<dyn Any + Send + Sync>),
}

impl QueryArg {
    /// Wraps an attribute handled by the target field's attribute converter.
    pub fn attribute<A: Any + Send + Sync>(attribute: A) -> Self {
        QueryArg::Attribute(Box::new(attribute))
    }
}

macro_rules! native_query_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for QueryArg {
                fn from(value: $ty) -> Self {
                    QueryArg::Native(Value::from(value))
                }
            }
        )+
    };
}

native_query_arg!(
    Value,
    i64,
    i32,
    f64,
    bool,
    String,
    &str,
    Uuid,
    DateTime<Utc>,
    NaiveDate,
    Vec<Value>,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    And,
    Or,
}

/// Converts a query argument aimed at `field` into its native value: through
/// the field's attribute converter, or by coercion to the declared type of a
/// plain field.
pub(crate) fn convert_argument(
    field: &FieldMapping,
    converters: &Converters,
    argument: QueryArg,
) -> Result<Value> {
    match (field.converter(), argument) {
        (Some(reference), QueryArg::Attribute(attribute)) => {
            let converter = converters.get(reference)?;
            converter.to_native_dyn(&*attribute)
        }
        (None, QueryArg::Attribute(_)) => Err(MapperError::Mapping(format!(
            "Field '{}' has no attribute converter",
            field.field_name()
        ))),
        (Some(_), QueryArg::Native(value)) => Ok(value),
        (None, QueryArg::Native(value)) => match field.kind() {
            MappingType::Default => field.coerce(value),
            _ => Ok(value),
        },
    }
}

/// Resolution state shared by the select and delete builders. The first
/// failure is kept and reported by `build`.
pub struct FilterState {
    metadata: Arc<EntityMetadata>,
    converters: Arc<Converters>,
    condition: Option<Condition>,
    error: Option<MapperError>,
}

impl FilterState {
    fn new(metadata: Arc<EntityMetadata>, converters: Arc<Converters>) -> Self {
        Self {
            metadata,
            converters,
            condition: None,
            error: None,
        }
    }

    fn native_name(&self, path: &str) -> String {
        self.metadata.column_field(path)
    }

    fn convert(&self, path: &str, argument: QueryArg) -> Result<Value> {
        let Some(mapping) = self.metadata.find_native(path) else {
            return match argument {
                QueryArg::Native(value) => Ok(value),
                QueryArg::Attribute(_) => Err(MapperError::Mapping(format!(
                    "Cannot convert an attribute for unknown path '{}' of {}",
                    path,
                    self.metadata.name()
                ))),
            };
        };
        convert_argument(mapping.field(), &self.converters, argument)
    }

    fn push(&mut self, join: Join, negated: bool, condition: Result<Condition>) {
        if self.error.is_some() {
            return;
        }
        let condition = match condition {
            Ok(condition) if negated => condition.negate(),
            Ok(condition) => condition,
            Err(err) => {
                self.error = Some(err);
                return;
            }
        };
        self.condition = Some(match (self.condition.take(), join) {
            (None, _) => condition,
            (Some(current), Join::And) => current.and(condition),
            (Some(current), Join::Or) => current.or(condition),
        });
    }

    /// The resolved condition. A variant shares its parent's record name, so
    /// its discriminator is always part of the filter.
    fn finish(self) -> Result<(Arc<EntityMetadata>, Option<Condition>)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let condition = match self.metadata.inheritance() {
            Some(inheritance) => {
                let discriminator = Condition::eq(
                    inheritance.discriminator_column(),
                    inheritance.discriminator_value(),
                );
                Some(match self.condition {
                    Some(condition) => condition.and(discriminator),
                    None => discriminator,
                })
            }
            None => self.condition,
        };
        Ok((self.metadata, condition))
    }
}

/// Builders that accept conditions.
pub trait Filtered: Sized {
    #[doc(hidden)]
    fn filter_state(&mut self) -> &mut FilterState;
}

/// Pending condition on one attribute path.
#[must_use]
pub struct MapperCondition<B> {
    builder: B,
    path: String,
    join: Join,
    negated: bool,
}

impl<B: Filtered> MapperCondition<B> {
    fn new(builder: B, path: &str, join: Join) -> Self {
        Self {
            builder,
            path: path.to_string(),
            join,
            negated: false,
        }
    }

    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    fn apply(mut self, operator: Operator, arguments: Vec<QueryArg>) -> B {
        let state = self.builder.filter_state();
        let name = state.native_name(&self.path);
        let converted: Result<Vec<Value>> = arguments
            .into_iter()
            .map(|argument| match (operator, argument) {
                // patterns are never coerced to the field type
                (Operator::Like, QueryArg::Native(value)) => Ok(value),
                (_, argument) => state.convert(&self.path, argument),
            })
            .collect();
        let condition = converted.map(|mut values| {
            let value = match operator {
                Operator::Between | Operator::In => Value::List(values),
                _ => values.pop().unwrap_or(Value::Null),
            };
            Condition::compare(operator, name, value)
        });
        state.push(self.join, self.negated, condition);
        self.builder
    }

    pub fn eq(self, value: impl Into<QueryArg>) -> B {
        self.apply(Operator::Equals, vec![value.into()])
    }

    pub fn gt(self, value: impl Into<QueryArg>) -> B {
        self.apply(Operator::GreaterThan, vec![value.into()])
    }

    pub fn gte(self, value: impl Into<QueryArg>) -> B {
        self.apply(Operator::GreaterEqualsThan, vec![value.into()])
    }

    pub fn lt(self, value: impl Into<QueryArg>) -> B {
        self.apply(Operator::LesserThan, vec![value.into()])
    }

    pub fn lte(self, value: impl Into<QueryArg>) -> B {
        self.apply(Operator::LesserEqualsThan, vec![value.into()])
    }

    pub fn like(self, pattern: impl Into<QueryArg>) -> B {
        self.apply(Operator::Like, vec![pattern.into()])
    }

    pub fn between(self, low: impl Into<QueryArg>, high: impl Into<QueryArg>) -> B {
        self.apply(Operator::Between, vec![low.into(), high.into()])
    }

    pub fn in_<I, V>(self, values: I) -> B
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryArg>,
    {
        self.apply(Operator::In, values.into_iter().map(Into::into).collect())
    }
}

/// Pending sort on one attribute path.
#[must_use]
pub struct MapperOrder<T, X> {
    select: MapperSelect<T, X>,
    path: String,
}

impl<T, X> MapperOrder<T, X> {
    fn sort(mut self, sort: fn(String) -> Sort) -> MapperSelect<T, X> {
        let name = self.select.state.native_name(&self.path);
        self.select.sorts.push(sort(name));
        self.select
    }

    pub fn asc(self) -> MapperSelect<T, X> {
        self.sort(|name| Sort::asc(name))
    }

    pub fn desc(self) -> MapperSelect<T, X> {
        self.sort(|name| Sort::desc(name))
    }
}

/// Select builder for entity `T`. `X` carries whatever executes the query;
/// a bare builder uses `()` and only produces a [`SelectQuery`].
#[must_use]
pub struct MapperSelect<T, X = ()> {
    pub(crate) executor: X,
    state: FilterState,
    sorts: Vec<Sort>,
    skip: u64,
    limit: u64,
    _entity: PhantomData<fn() -> T>,
}

impl<T> MapperSelect<T, ()> {
    pub fn new(metadata: Arc<EntityMetadata>, converters: Arc<Converters>) -> Self {
        Self::with_executor(metadata, converters, ())
    }
}

impl<T, X> MapperSelect<T, X> {
    pub(crate) fn with_executor(
        metadata: Arc<EntityMetadata>,
        converters: Arc<Converters>,
        executor: X,
    ) -> Self {
        Self {
            executor,
            state: FilterState::new(metadata, converters),
            sorts: Vec::new(),
            skip: 0,
            limit: 0,
            _entity: PhantomData,
        }
    }

    pub fn where_(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::And)
    }

    pub fn and(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::And)
    }

    pub fn or(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::Or)
    }

    pub fn order_by(self, path: &str) -> MapperOrder<T, X> {
        MapperOrder {
            select: self,
            path: path.to_string(),
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.state.metadata
    }

    /// Splits off the executor and the resolved query.
    pub(crate) fn into_parts(self) -> (X, Result<SelectQuery>) {
        let MapperSelect {
            executor,
            state,
            sorts,
            skip,
            limit,
            ..
        } = self;
        let query = state.finish().map(|(metadata, condition)| SelectQuery {
            name: metadata.name().to_string(),
            condition,
            sorts,
            skip,
            limit,
        });
        (executor, query)
    }

    pub fn build(self) -> Result<SelectQuery> {
        self.into_parts().1
    }
}

impl<T, X> Filtered for MapperSelect<T, X> {
    fn filter_state(&mut self) -> &mut FilterState {
        &mut self.state
    }
}

/// Delete builder for entity `T`.
#[must_use]
pub struct MapperDelete<T, X = ()> {
    pub(crate) executor: X,
    state: FilterState,
    _entity: PhantomData<fn() -> T>,
}

impl<T> MapperDelete<T, ()> {
    pub fn new(metadata: Arc<EntityMetadata>, converters: Arc<Converters>) -> Self {
        Self::with_executor(metadata, converters, ())
    }
}

impl<T, X> MapperDelete<T, X> {
    pub(crate) fn with_executor(
        metadata: Arc<EntityMetadata>,
        converters: Arc<Converters>,
        executor: X,
    ) -> Self {
        Self {
            executor,
            state: FilterState::new(metadata, converters),
            _entity: PhantomData,
        }
    }

    pub fn where_(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::And)
    }

    pub fn and(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::And)
    }

    pub fn or(self, path: &str) -> MapperCondition<Self> {
        MapperCondition::new(self, path, Join::Or)
    }

    pub(crate) fn into_parts(self) -> (X, Result<DeleteQuery>) {
        let MapperDelete {
            executor, state, ..
        } = self;
        let query = state.finish().map(|(metadata, condition)| DeleteQuery {
            name: metadata.name().to_string(),
            condition,
        });
        (executor, query)
    }

    pub fn build(self) -> Result<DeleteQuery> {
        self.into_parts().1
    }
}

impl<T, X> Filtered for MapperDelete<T, X> {
    fn filter_state(&mut self) -> &mut FilterState {
        &mut self.state
    }
}
