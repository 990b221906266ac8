//! Playlog Sync - Resilient delivery and incremental catalog sync
//!
//! Provides:
//! - A circuit breaker with jittered exponential backoff in front of every
//!   remote call
//! - A durable queue for session events that could not be delivered
//! - Library and achievement baselines for diff uploads
//! - The orchestrator tying these together, and a periodic scheduler
//!
//! ## Modules
//!
//! - [`breaker`] - Closed/Open/HalfOpen state machine and retry executor
//! - [`queue`] - Persistent FIFO of pending start/finish operations
//! - [`snapshot`] - Baseline owner with persist-then-commit updates
//! - [`orchestrator`] - Session tracking, queue flush, full/diff catalog sync
//! - [`scheduler`] - Interval loop with cancellation

pub mod breaker;
pub mod orchestrator;
pub mod queue;
pub mod scheduler;
pub mod snapshot;

pub use breaker::{BreakerError, BreakerSettings, CircuitBreaker, CircuitState};
pub use orchestrator::{Collaborators, OrchestratorSettings, SyncOrchestrator, SyncStatus};
pub use queue::{FlushReport, PendingOperationQueue};
pub use scheduler::SyncScheduler;
pub use snapshot::SnapshotStore;
