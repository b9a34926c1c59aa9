//! Scene access: the query contract against an external image archive
//! and an in-memory catalog implementation.

pub mod catalog;

pub use catalog::{ImageSource, MemoryCatalog, SceneQuery};
