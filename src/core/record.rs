use std::collections::BTreeMap;

use crate::core::Value;
use crate::core::value::elements_eq;

/// One key/value pair of a native record.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: String,
    pub value: Value,
}

impl Element {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The vendor-neutral record exchanged with a storage engine: a document, a
/// column family row or the property set of a vertex.
///
/// Keys are unique within one level. Adding a key that already exists replaces
/// its value in place, so insertion order of the first occurrence is kept.
#[derive(Debug, Clone)]
pub struct Record {
    name: String,
    elements: Vec<Element>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_elements(name: impl Into<String>, elements: Vec<Element>) -> Self {
        let mut record = Self::new(name);
        record.add_all(elements);
        record
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.add_element(Element::new(key, value));
    }

    pub fn add_element(&mut self, element: Element) {
        match self.elements.iter_mut().find(|e| e.key == element.key) {
            Some(existing) => existing.value = element.value,
            None => self.elements.push(element),
        }
    }

    pub fn add_all<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = Element>,
    {
        for element in elements {
            self.add_element(element);
        }
    }

    pub fn find(&self, key: &str) -> Option<&Value> {
        self.elements
            .iter()
            .find(|element| element.key == key)
            .map(|element| &element.value)
    }

    /// Resolves a dotted key against nested records.
    pub fn find_path(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            None => self.find(path),
            Some((head, rest)) => self.find(head)?.find_path(rest),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|element| element.key != key);
        before != self.elements.len()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|element| element.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.elements
            .iter()
            .map(|element| (element.key.clone(), element.value.clone()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        Value::Record(self.elements.clone()).to_json()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && elements_eq(&self.elements, &other.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_existing_key() {
        let mut record = Record::new("Person");
        record.add("name", "Ada");
        record.add("age", 20);
        record.add("name", "Grace");

        assert_eq!(record.len(), 2);
        assert_eq!(record.find("name"), Some(&Value::Text("Grace".into())));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn test_remove_and_equality() {
        let mut left = Record::new("Person");
        left.add("name", "Ada");
        left.add("age", 20);

        let mut right = Record::new("Person");
        right.add("age", 20);
        right.add("name", "Ada");
        assert_eq!(left, right);

        assert!(right.remove("age"));
        assert!(!right.remove("age"));
        assert_ne!(left, right);
        assert_ne!(left, Record::with_elements("Other", left.elements().to_vec()));
    }

    #[test]
    fn test_find_path_into_nested_record() {
        let mut record = Record::new("Address");
        record.add(
            "zipCode",
            Value::Record(vec![Element::new("zip", "01312321")]),
        );
        assert_eq!(
            record.find_path("zipCode.zip"),
            Some(&Value::Text("01312321".into()))
        );
        assert_eq!(record.to_map().len(), 1);
    }
}
