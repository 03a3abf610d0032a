//! Editor session persistence
//!
//! Keeps an author's in-progress text, selection and scroll position across
//! reloads, tab duplication and storage pressure without ever blocking input.
//!
//! ## How it works
//!
//! 1. **Identity**: each tab gets a random session id cached in the tab store
//! 2. **Debounced save**: edits schedule a save; after a quiet period the
//!    snapshot is compressed and written under `compiler:state:<session id>`
//! 3. **Fallback**: every accepted save also writes the raw text to a single
//!    durable slot, as does hiding or closing the tab
//! 4. **Restore**: on mount the namespaced snapshot is read, then the legacy
//!    key, then the fallback text
//! 5. **Sweep**: expired or malformed snapshots left by abandoned tabs are
//!    deleted on startup
//!
//! ## Key Layout
//!
//! ```text
//! tab store                                durable store
//! ├── compiler:session-id    (tab id)      ├── compiler:code-fallback (raw text)
//! ├── compiler:state:{id}    (snapshot)    ├── compiler:code          (legacy, migrated)
//! └── compiler:output        (last run)    └── access_token           (logout signal)
//! ```

pub mod codec;
pub mod fallback;
pub mod identity;
pub mod primary;
pub mod scheduler;

pub use codec::{Codec, CodecError, CompressionCapability, Encoded};
pub use fallback::{FallbackStore, OutputCache};
pub use identity::{get_or_create_session_id, SessionId};
pub use primary::{DiscardReason, LoadedSnapshot, PrimaryStore, RestoreSource};
pub use scheduler::{PersistenceScheduler, SaveOutcome};
