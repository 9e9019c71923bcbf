pub mod entity_converter;
pub mod field_value;
pub mod graph;
pub mod key_value;

pub use entity_converter::EntityConverter;
pub use field_value::FieldValue;
pub use graph::{Edge, EdgeEntity, GraphConverter, Vertex};
pub use key_value::{KeyValue, KeyValueConverter};
