//! Storage abstraction and implementations for learnpath.
//!
//! This crate provides trait-based seams for the persistent progress store
//! and the curriculum provider, with JSON-file and in-memory
//! implementations of each.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{CurriculumSource, ProgressStore, Result, StorageError};
pub use json_storage::{JsonCurriculum, JsonStore};
pub use memory::{MemoryStore, StaticCurriculum};
