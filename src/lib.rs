// ============================================================================
// nosqlmap Library
// ============================================================================

//! Entity mapping between statically described Rust types and vendor-neutral
//! NoSQL records.
//!
//! Types describe their schema once, either by hand through
//! [`EntityDescriptor::builder`] or with `#[derive(Entity)]`. The
//! [`EntityConverter`] turns instances into [`Record`]s and back, the query
//! builders translate attribute paths into native ones, and the
//! [`MappingTemplate`] runs the persist workflow against any
//! [`RecordManager`].
//!
//! ```
//! use nosqlmap::prelude::*;
//!
//! #[derive(Debug, Default, PartialEq, Entity)]
//! struct Person {
//!     #[column(id)]
//!     id: i64,
//!     name: String,
//! }
//!
//! # fn main() -> nosqlmap::Result<()> {
//! let context = MappingContext::default();
//! let converter = context.entity_converter();
//!
//! let person = Person { id: 1, name: "Ada".into() };
//! let record = converter.to_record(&person)?;
//! assert_eq!(record.find("_id"), Some(&Value::Integer(1)));
//! assert_eq!(converter.to_entity::<Person>(&record)?, person);
//! # Ok(())
//! # }
//! ```

extern crate self as nosqlmap;

pub mod config;
pub mod context;
pub mod convert;
pub mod core;
pub mod event;
pub mod mapping;
pub mod prelude;
pub mod query;
pub mod store;
pub mod template;

// Re-export main types for convenience
pub use config::MappingConfig;
pub use context::MappingContext;
pub use convert::{
    Edge, EdgeEntity, EntityConverter, FieldValue, GraphConverter, KeyValue, KeyValueConverter,
    Vertex,
};
pub use core::{Element, MapperError, Record, Result, Value};
pub use event::{EventManager, EventPayload, EventPhase};
pub use mapping::{
    Arguments, AttributeConverter, Column, Converters, Entity, EntityDescriptor, EntityMetadata,
    MappedValue, MappingType, Parameter, TypeRef,
};
pub use query::{Condition, DeleteQuery, MapperDelete, MapperSelect, QueryArg, SelectQuery, Sort};
pub use store::{InMemoryRecordManager, RecordManager};
pub use template::MappingTemplate;

/// `#[derive(Entity)]`, see the `nosqlmap_derive` crate for the attributes.
pub use nosqlmap_derive::Entity;
