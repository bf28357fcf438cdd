//! fleetshift-gateway — the boundary between rollouts and the platform.
//!
//! Every control-plane request a rollout makes goes through
//! [`PlatformGateway`]. The trait is thin: one method per
//! request, typed results, no retries. Platform SDK failures are mapped into
//! [`GatewayError`] here so the rollout crate never sees SDK types.
//!
//! # Components
//!
//! - **`gateway`** — The `PlatformGateway` trait and its boxed-future alias
//! - **`error`** — `GatewayError` (NotFound / Unavailable / Rejected)
//! - **`memory`** — `InMemoryPlatform`, a simulated control plane seeded
//!   from a JSON fixture, used by tests and the CLI's dry-run mode

pub mod error;
pub mod gateway;
pub mod memory;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{GatewayFuture, PlatformGateway};
pub use memory::{InMemoryPlatform, PlatformCall, PlatformFixture, Simulation};
