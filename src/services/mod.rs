//! Persistence services and external integrations
//!
//! Everything that touches storage, the clock or the network lives here.

pub mod execution;
pub mod session;
pub mod storage;
pub mod time_source;
#[cfg(feature = "runtime")]
pub mod tracing_setup;
