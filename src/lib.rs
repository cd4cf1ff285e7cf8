//! Earth-observation mission planning library.
//!
//! Computes satellite-target visibility windows, builds imaging
//! opportunities, schedules them under attitude-slew constraints, and
//! resolves cross-satellite conflicts. See `SPEC_FULL.md` for the full
//! module map.

pub mod cache;
pub mod conflict;
pub mod config;
pub mod error;
pub mod export;
pub mod feasibility;
pub mod geometry;
pub mod opportunity;
pub mod orbit;
pub mod plan;
pub mod quality;
pub mod scheduler;
pub mod tle;
pub mod types;
pub mod visibility;

pub use config::{Algorithm, SchedulerConfig};
pub use error::{PlanError, PlanResult};
pub use plan::{run, CancellationToken, Horizon, PlanRequest, PlanResponse};
pub use types::{GroundTarget, Satellite, ScheduledOpportunity};
