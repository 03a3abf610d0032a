//! View layer
//!
//! Geometry-only presentation logic; rendering belongs to the host.

pub mod viewport;
