//! Common imports for code declaring and mapping entities.

pub use crate::config::MappingConfig;
pub use crate::context::MappingContext;
pub use crate::convert::{
    EdgeEntity, EntityConverter, GraphConverter, KeyValue, KeyValueConverter, Vertex,
};
pub use crate::core::{Element, MapperError, Record, Value};
pub use crate::event::{EventPayload, EventPhase};
pub use crate::mapping::{
    Arguments, AttributeConverter, Column, Entity, EntityDescriptor, MappedValue, Parameter,
};
pub use crate::query::{Condition, QueryArg};
pub use crate::store::{InMemoryRecordManager, RecordManager};
pub use crate::template::MappingTemplate;
pub use nosqlmap_derive::Entity;
