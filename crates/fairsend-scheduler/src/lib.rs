//! fairsend-scheduler — dispatch scoring and the per-tick transfer engine.
//!
//! Owns the live client set and the fixed node pool. One call to
//! [`World::tick`] runs a discrete simulation step:
//!
//! - Advance every in-flight transfer by one unit
//! - Release nodes whose client no longer exists
//! - Assign waiting clients to idle nodes, lowest score first
//!
//! # Architecture
//!
//! ```text
//! World
//!   ├── clock (logical Tick)
//!   ├── nodes  (fixed pool, recycled WAITING <-> PROCESSING_FILE)
//!   ├── clients (live set, removed once their queue drains)
//!   └── scorer (weight² / clients + 1 / elapsed² × clients)
//! ```

pub mod error;
pub mod scheduler;
pub mod scorer;
pub mod snapshot;

pub use error::{InvariantViolation, SchedulerError, SchedulerResult};
pub use scheduler::{TickReport, World};
pub use scorer::{CandidateScore, ScoreBreakdown, rank_candidates, score, score_breakdown, select_candidate};
pub use snapshot::{ClientView, FileView, WorldSnapshot};
