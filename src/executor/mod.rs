pub mod engine;

pub use engine::{DmlEngine, FieldValues, SortSpec};
