//! fleetshift rollouts — machine image and container image updates.
//!
//! This crate drives a single rollout from start to finish against a
//! [`PlatformGateway`](fleetshift_gateway::PlatformGateway): snapshot the
//! current state, plan the target, cut over, poll for readiness, then either
//! drain and retire old capacity (AMI path) or roll back to the prior
//! revision (service path).
//!
//! # Components
//!
//! - **`snapshot`** — Read-only capture of the pre-rollout state
//! - **`planner`** — Pure derivation of target templates, groups, revisions
//! - **`cutover`** — Ordered mutating steps, with touched-resource context on failure
//! - **`poller`** — Bounded readiness loop and the two readiness predicates
//! - **`drain`** — Drain old members and delete old groups
//! - **`rollback`** — Revert a service to its prior revision
//! - **`ami`** / **`service`** — The two orchestrators

pub mod ami;
pub mod attempt;
pub mod cutover;
pub mod drain;
pub mod error;
pub mod planner;
pub mod policy;
pub mod poller;
pub mod rollback;
pub mod service;
pub mod snapshot;

pub use ami::{AmiRolloutReport, AmiRolloutRequest, run_ami_rollout};
pub use attempt::{RolloutAttempt, RolloutPhase};
pub use error::{CutoverStep, RolloutError, RolloutResult};
pub use poller::{PollOutcome, capacity_doubled, success_condition};
pub use policy::PollPolicy;
pub use service::{ServiceOutcome, ServiceRolloutRequest, run_service_rollout};
