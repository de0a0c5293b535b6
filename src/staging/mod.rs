// src/staging/mod.rs

// Pending-transfer registry and the stage/confirm handshake built on it
pub mod service;
pub mod store;

pub use service::{StagedLink, StagingError, StagingService, TransferExecutor, CONFIRM_FEE_LEVEL};
pub use store::{InMemoryPendingStore, PendingStore, StagedTransfer};
