pub mod condition;
pub mod mapper;

pub use condition::{Condition, DeleteQuery, Direction, Operator, SelectQuery, Sort};
pub use mapper::{Filtered, MapperCondition, MapperDelete, MapperOrder, MapperSelect, QueryArg};
