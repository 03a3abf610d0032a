//! Core data model for persisted editor sessions

pub mod snapshot;

pub use snapshot::{EditorSnapshot, EditorState, Selection, SCHEMA_VERSION};
