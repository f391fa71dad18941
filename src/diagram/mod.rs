//! Diagram records and their wire representations.

pub mod model;

pub use model::{Diagram, DiagramDocument, DiagramRecord, now_millis};
