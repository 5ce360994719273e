pub mod audit;
pub mod error;
pub mod kv;
pub mod models;
pub mod session;
pub mod storage;
pub mod tally;
pub mod validation;
pub mod workflow;

pub use error::{ElectionError, ErrorCode, Result, ErrorResponse};
pub use kv::{KeyValueStore, MemoryStore, StoreError};
pub use models::*;
pub use session::{AdminSession, VoterSession};
pub use storage::ElectionStore;
pub use tally::{ElectionSummary, RoleTally, TallyEntry};
pub use workflow::{BallotState, VoterResults};
