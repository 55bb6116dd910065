//! Request/response correlation broker.
//!
//! # Data Flow
//! ```text
//! client submit
//!     → dispatcher.rs (validate, key.rs generates key, store.rs put)
//!     → key returned to client immediately
//!     → background task → downstream executor
//!
//! downstream callback
//!     → callback.rs → store.rs complete_with (write-once)
//!
//! client poll
//!     → resolver.rs → store.rs touch → NotFound | Pending | Completed
//! ```
//!
//! # Design Decisions
//! - The store is the only shared mutable state; all access goes through it
//! - A record is Pending until its result arrives, then Completed forever
//! - Records are retained for the life of the process (no expiry)
//! - Failed downstream calls leave the record Pending; the failure is only
//!   reported on the dispatch report channel

pub mod callback;
pub mod dispatcher;
pub mod error;
pub mod key;
pub mod record;
pub mod resolver;
pub mod store;

pub use callback::CallbackReceiver;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{StoreError, SubmitError, ValidationError};
pub use key::{CorrelationKey, KeyGenerator, UuidKeyGenerator};
pub use record::{
    ClientRequest, HeaderSet, RecordState, RequestDescriptor, RequestRecord, ResultDescriptor,
    TargetMethod,
};
pub use resolver::{PollOutcome, StatusResolver};
pub use store::{CompletionOutcome, RecordStore, RecordSummary};
