pub mod error;
pub mod record;
pub mod value;

pub use error::{MapperError, Result};
pub use record::{Element, Record};
pub use value::Value;
