use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

use crate::config::MappingConfig;
use crate::core::{Element, MapperError, Record, Result, Value};
use crate::query::{Condition, DeleteQuery, Direction, Operator, SelectQuery, Sort};
use crate::store::RecordManager;
use crate::store::pattern::eval_like;

/// Record manager keeping every record in memory, grouped by record name.
///
/// Conditions address nested values with dotted native paths. Records
/// missing a compared key never match. Ids are never assigned.
pub struct InMemoryRecordManager {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    case_sensitive_like: bool,
}

impl Default for InMemoryRecordManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordManager {
    pub fn new() -> Self {
        Self::with_config(&MappingConfig::default())
    }

    pub fn with_config(config: &MappingConfig) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            case_sensitive_like: config.case_sensitive_like,
        }
    }

    /// Every record stored under `name`, in insertion order.
    pub async fn records(&self, name: &str) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn matches(&self, record: &Record, condition: &Condition) -> Result<bool> {
        match condition {
            Condition::Compare { operator, element } => self.compare(record, *operator, element),
            Condition::Not(inner) => Ok(!self.matches(record, inner)?),
            Condition::And(conditions) => {
                for condition in conditions {
                    if !self.matches(record, condition)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(conditions) => {
                for condition in conditions {
                    if self.matches(record, condition)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn compare(&self, record: &Record, operator: Operator, element: &Element) -> Result<bool> {
        let Some(actual) = record.find_path(&element.key) else {
            return Ok(false);
        };
        let expected = &element.value;

        match operator {
            Operator::Equals => Ok(equals(actual, expected)),
            Operator::GreaterThan => Ok(ordering(actual, expected) == Some(Ordering::Greater)),
            Operator::GreaterEqualsThan => Ok(matches!(
                ordering(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            Operator::LesserThan => Ok(ordering(actual, expected) == Some(Ordering::Less)),
            Operator::LesserEqualsThan => Ok(matches!(
                ordering(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            )),
            Operator::Like => match (actual, expected) {
                (Value::Text(text), Value::Text(pattern)) => {
                    eval_like(text, pattern, self.case_sensitive_like)
                }
                (_, Value::Text(_)) => Ok(false),
                (_, other) => Err(MapperError::Store(format!(
                    "LIKE expects a text pattern, got {}",
                    other.type_name()
                ))),
            },
            Operator::Between => match expected.as_list() {
                Some([low, high]) => Ok(matches!(
                    ordering(actual, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    ordering(actual, high),
                    Some(Ordering::Less | Ordering::Equal)
                )),
                _ => Err(MapperError::Store(format!(
                    "BETWEEN on '{}' expects two bounds",
                    element.key
                ))),
            },
            Operator::In => match expected.as_list() {
                Some(candidates) => Ok(candidates.iter().any(|candidate| equals(actual, candidate))),
                None => Err(MapperError::Store(format!(
                    "IN on '{}' expects a list of values",
                    element.key
                ))),
            },
        }
    }

    fn filter(&self, records: &[Record], condition: Option<&Condition>) -> Result<Vec<Record>> {
        let mut selected = Vec::new();
        for record in records {
            let keep = match condition {
                Some(condition) => self.matches(record, condition)?,
                None => true,
            };
            if keep {
                selected.push(record.clone());
            }
        }
        Ok(selected)
    }
}

/// Equality where a stored list matches any of its items.
fn equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::List(items), expected) if !matches!(expected, Value::List(_)) => {
            items.iter().any(|item| item == expected)
        }
        _ => actual == expected,
    }
}

/// Ordering of two comparable non-null values.
fn ordering(actual: &Value, expected: &Value) -> Option<Ordering> {
    if actual.is_null() || expected.is_null() {
        return None;
    }
    actual.compare(expected).ok()
}

fn sort_records(records: &mut [Record], sorts: &[Sort]) {
    records.sort_by(|left, right| {
        for sort in sorts {
            let left = left.find_path(&sort.name).unwrap_or(&Value::Null);
            let right = right.find_path(&sort.name).unwrap_or(&Value::Null);
            let order = left.compare(right).unwrap_or(Ordering::Equal);
            let order = match sort.direction {
                Direction::Asc => order,
                Direction::Desc => order.reverse(),
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl RecordManager for InMemoryRecordManager {
    async fn insert(&self, record: Record) -> Result<Record> {
        let mut collections = self.collections.write().await;
        collections
            .entry(record.name().to_string())
            .or_default()
            .push(record.clone());
        debug!("Inserted {} record", record.name());
        Ok(record)
    }

    async fn update(&self, record: Record, id_key: &str) -> Result<Record> {
        let id = record.find(id_key).cloned().ok_or_else(|| {
            MapperError::Store(format!(
                "Cannot update a {} record without '{}'",
                record.name(),
                id_key
            ))
        })?;

        let mut collections = self.collections.write().await;
        let records = collections.entry(record.name().to_string()).or_default();
        let mut replaced = false;
        for stored in records.iter_mut() {
            if stored.find(id_key) == Some(&id) {
                *stored = record.clone();
                replaced = true;
            }
        }
        if !replaced {
            records.push(record.clone());
        }
        debug!("Updated {} record {} (replaced: {})", record.name(), id, replaced);
        Ok(record)
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>> {
        let collections = self.collections.read().await;
        let Some(records) = collections.get(&query.name) else {
            return Ok(Vec::new());
        };

        let mut selected = self.filter(records, query.condition.as_ref())?;
        drop(collections);

        sort_records(&mut selected, &query.sorts);
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = match query.limit {
            0 => usize::MAX,
            limit => usize::try_from(limit).unwrap_or(usize::MAX),
        };
        Ok(selected.into_iter().skip(skip).take(limit).collect())
    }

    async fn delete(&self, query: &DeleteQuery) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(&query.name) else {
            return Ok(0);
        };

        let mut kept = Vec::with_capacity(records.len());
        let mut removed = 0u64;
        for record in records.drain(..) {
            let matched = match &query.condition {
                Some(condition) => self.matches(&record, condition)?,
                None => true,
            };
            if matched {
                removed += 1;
            } else {
                kept.push(record);
            }
        }
        *records = kept;
        debug!("Deleted {} {} records", removed, query.name);
        Ok(removed)
    }

    async fn count(&self, name: &str, condition: Option<&Condition>) -> Result<u64> {
        let collections = self.collections.read().await;
        let Some(records) = collections.get(name) else {
            return Ok(0);
        };
        match condition {
            Some(_) => Ok(self.filter(records, condition)?.len() as u64),
            None => Ok(records.len() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: i64, name: &str, age: i64) -> Record {
        let mut record = Record::new("Person");
        record.add("_id", id);
        record.add("name", name);
        record.add("age", age);
        record
    }

    async fn seeded() -> InMemoryRecordManager {
        let manager = InMemoryRecordManager::new();
        for (id, name, age) in [(1, "Ada", 36), (2, "Grace", 85), (3, "Alan", 41)] {
            manager.insert(person(id, name, age)).await.unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn test_select_with_condition_and_sort() {
        let manager = seeded().await;
        let query = SelectQuery::new("Person")
            .with_condition(Condition::gt("age", 40))
            .with_sort(Sort::desc("age"));

        let records = manager.select(&query).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.find("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["Grace", "Alan"]);
    }

    #[tokio::test]
    async fn test_skip_and_limit() {
        let manager = seeded().await;
        let query = SelectQuery::new("Person")
            .with_sort(Sort::asc("_id"))
            .with_skip(1)
            .with_limit(1);
        let records = manager.select(&query).await.unwrap();
        assert_eq!(records, vec![person(2, "Grace", 85)]);
    }

    #[tokio::test]
    async fn test_like_between_in_and_not() {
        let manager = seeded().await;

        let like = SelectQuery::new("Person").with_condition(Condition::like("name", "A%"));
        assert_eq!(manager.select(&like).await.unwrap().len(), 2);

        let between =
            SelectQuery::new("Person").with_condition(Condition::between("age", 36, 41));
        assert_eq!(manager.select(&between).await.unwrap().len(), 2);

        let in_list = SelectQuery::new("Person")
            .with_condition(Condition::in_("_id", vec![Value::Integer(1), Value::Integer(3)]));
        assert_eq!(manager.select(&in_list).await.unwrap().len(), 2);

        let not = SelectQuery::new("Person")
            .with_condition(Condition::eq("name", "Ada").negate());
        assert_eq!(manager.select(&not).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_by_id() {
        let manager = seeded().await;
        manager.update(person(2, "Grace Hopper", 85), "_id").await.unwrap();
        manager.update(person(4, "Edsger", 72), "_id").await.unwrap();

        let records = manager.records("Person").await;
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].find("name"), Some(&Value::Text("Grace Hopper".into())));
        assert!(manager.update(Record::new("Person"), "_id").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let manager = seeded().await;
        let query = DeleteQuery::new("Person").with_condition(Condition::lt("age", 40));
        assert_eq!(manager.delete(&query).await.unwrap(), 1);
        assert_eq!(manager.count("Person", None).await.unwrap(), 2);
        assert_eq!(manager.count("Unknown", None).await.unwrap(), 0);

        let named = Condition::eq("name", "Grace");
        assert_eq!(manager.count("Person", Some(&named)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nested_paths_and_list_membership() {
        let manager = InMemoryRecordManager::new();
        let mut record = Record::new("Customer");
        record.add(
            "address",
            Value::Record(vec![Element::new("city", "Salvador")]),
        );
        record.add("tags", Value::List(vec![Value::from("vip"), Value::from("new")]));
        manager.insert(record).await.unwrap();

        let by_city = SelectQuery::new("Customer")
            .with_condition(Condition::eq("address.city", "Salvador"));
        assert_eq!(manager.select(&by_city).await.unwrap().len(), 1);

        let by_tag = SelectQuery::new("Customer").with_condition(Condition::eq("tags", "vip"));
        assert_eq!(manager.select(&by_tag).await.unwrap().len(), 1);
    }
}
