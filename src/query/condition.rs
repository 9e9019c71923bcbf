use std::fmt;

use crate::core::{Element, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    GreaterThan,
    GreaterEqualsThan,
    LesserThan,
    LesserEqualsThan,
    Like,
    /// Element value is a two-item list `[low, high]`, both inclusive.
    Between,
    /// Element value is a list of candidates.
    In,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Equals => "=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqualsThan => ">=",
            Operator::LesserThan => "<",
            Operator::LesserEqualsThan => "<=",
            Operator::Like => "LIKE",
            Operator::Between => "BETWEEN",
            Operator::In => "IN",
        };
        write!(f, "{}", symbol)
    }
}

/// Filter over native records, expressed against native keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare { operator: Operator, element: Element },
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn compare(operator: Operator, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Compare {
            operator,
            element: Element::new(name, value),
        }
    }

    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(Operator::Equals, name, value)
    }

    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(Operator::GreaterThan, name, value)
    }

    pub fn gte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(Operator::GreaterEqualsThan, name, value)
    }

    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(Operator::LesserThan, name, value)
    }

    pub fn lte(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(Operator::LesserEqualsThan, name, value)
    }

    pub fn like(name: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::compare(Operator::Like, name, pattern)
    }

    pub fn between(
        name: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::compare(
            Operator::Between,
            name,
            Value::List(vec![low.into(), high.into()]),
        )
    }

    pub fn in_(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(Operator::In, name, Value::List(values))
    }

    /// Negation; negating a negation unwraps it.
    pub fn negate(self) -> Self {
        match self {
            Condition::Not(inner) => *inner,
            other => Condition::Not(Box::new(other)),
        }
    }

    /// Conjunction, flattened into an existing `And`.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut conditions) => {
                conditions.push(other);
                Condition::And(conditions)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    /// Disjunction, flattened into an existing `Or`.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut conditions) => {
                conditions.push(other);
                Condition::Or(conditions)
            }
            first => Condition::Or(vec![first, other]),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { operator, element } => {
                write!(f, "{} {} {}", element.key, operator, element.value)
            }
            Condition::Not(inner) => write!(f, "NOT ({})", inner),
            Condition::And(conditions) | Condition::Or(conditions) => {
                let joiner = if matches!(self, Condition::And(_)) { " AND " } else { " OR " };
                let parts: Vec<String> = conditions.iter().map(|c| format!("({})", c)).collect();
                write!(f, "{}", parts.join(joiner))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub name: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Desc,
        }
    }
}

/// Select against one native record name. A `limit` of zero means no limit.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub name: String,
    pub condition: Option<Condition>,
    pub sorts: Vec<Sort>,
    pub skip: u64,
    pub limit: u64,
}

impl SelectQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
            sorts: Vec::new(),
            skip: 0,
            limit: 0,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub name: String,
    pub condition: Option<Condition>,
}

impl DeleteQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}
