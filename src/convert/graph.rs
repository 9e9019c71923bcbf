//! Graph-shaped conversion.
//!
//! A vertex keeps its id and label apart from its properties: the label is
//! the entity's record name and the id is the value of its id field, which
//! never appears among the properties. Edges join two vertices and carry
//! their own label and properties.

use std::any::Any;
use std::sync::Arc;

use crate::convert::EntityConverter;
use crate::core::{Element, MapperError, Record, Result, Value};
use crate::mapping::{Entity, EntityMetadata};

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    id: Option<Value>,
    label: String,
    properties: Vec<Element>,
}

impl Vertex {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a property, replacing one already stored under `key`.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let element = Element::new(key, value);
        match self.properties.iter_mut().find(|p| p.key == element.key) {
            Some(existing) => existing.value = element.value,
            None => self.properties.push(element),
        }
        self
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn properties(&self) -> &[Element] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: Option<Value>,
    pub label: String,
    pub outgoing: Vertex,
    pub incoming: Vertex,
    pub properties: Vec<Element>,
}

/// An edge whose endpoints are entities.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEntity<O, I> {
    pub id: Option<Value>,
    pub label: String,
    pub outgoing: O,
    pub incoming: I,
    pub properties: Vec<Element>,
}

impl<O, I> EdgeEntity<O, I> {
    pub fn new(outgoing: O, label: impl Into<String>, incoming: I) -> Self {
        Self {
            id: None,
            label: label.into(),
            outgoing,
            incoming,
            properties: Vec::new(),
        }
    }
}

pub struct GraphConverter {
    converter: EntityConverter,
}

impl GraphConverter {
    pub fn new(converter: EntityConverter) -> Self {
        Self { converter }
    }

    pub fn entity_converter(&self) -> &EntityConverter {
        &self.converter
    }

    pub fn to_vertex<T: Entity>(&self, entity: &T) -> Result<Vertex> {
        let (record, metadata) = self.converter.to_record_with_metadata(entity)?;
        let id_key = id_key(&metadata);
        let label = record.name().to_string();

        let mut id = None;
        let mut properties = Vec::with_capacity(record.len());
        for element in record.into_elements() {
            if Some(element.key.as_str()) == id_key {
                id = Some(element.value).filter(|value| !value.is_null());
            } else {
                properties.push(element);
            }
        }
        Ok(Vertex {
            id,
            label,
            properties,
        })
    }

    /// The entity's native elements without its id.
    pub fn properties<T: Entity>(&self, entity: &T) -> Result<Vec<Element>> {
        self.to_vertex(entity).map(|vertex| vertex.properties)
    }

    /// Rebuilds an entity from a vertex. The vertex id is fed to the id field
    /// of the concrete type the properties resolve to.
    pub fn to_entity<T: Entity>(&self, vertex: &Vertex) -> Result<T> {
        let record = self.to_record(vertex, &self.converter.entities().get::<T>()?)?;
        self.converter.to_entity(&record)
    }

    /// Rebuilds an entity of whichever loaded type is registered under the
    /// vertex label.
    pub fn to_entity_by_label(&self, vertex: &Vertex) -> Result<Box<dyn Any + Send>> {
        let metadata = self.converter.entities().find_by_name(vertex.label())?;
        let record = self.to_record(vertex, &metadata)?;
        self.converter.to_entity_by_name(&record)
    }

    pub fn to_entity_into<T: Entity>(&self, entity: &mut T, vertex: &Vertex) -> Result<()> {
        let record = self.to_record(vertex, &self.converter.entities().get::<T>()?)?;
        self.converter.to_entity_into(entity, &record)
    }

    pub fn to_edge<O: Entity, I: Entity>(&self, edge: &EdgeEntity<O, I>) -> Result<Edge> {
        Ok(Edge {
            id: edge.id.clone(),
            label: edge.label.clone(),
            outgoing: self.to_vertex(&edge.outgoing)?,
            incoming: self.to_vertex(&edge.incoming)?,
            properties: edge.properties.clone(),
        })
    }

    pub fn to_edge_entity<O: Entity, I: Entity>(&self, edge: &Edge) -> Result<EdgeEntity<O, I>> {
        Ok(EdgeEntity {
            id: edge.id.clone(),
            label: edge.label.clone(),
            outgoing: self.to_entity(&edge.outgoing)?,
            incoming: self.to_entity(&edge.incoming)?,
            properties: edge.properties.clone(),
        })
    }

    fn to_record(&self, vertex: &Vertex, metadata: &Arc<EntityMetadata>) -> Result<Record> {
        let mut record = Record::with_elements(vertex.label(), vertex.properties.clone());
        let Some(id) = vertex.id() else {
            return Ok(record);
        };
        let concrete = self.converter.concrete_metadata(metadata, record.elements())?;
        let key = id_key(&concrete).ok_or_else(|| {
            MapperError::Mapping(format!(
                "Vertex '{}' has an id but {} declares no id field",
                vertex.label(),
                concrete.type_name()
            ))
        })?;
        record.add(key, id.clone());
        Ok(record)
    }
}

fn id_key(metadata: &EntityMetadata) -> Option<&str> {
    metadata.id().map(|field| field.name())
}
