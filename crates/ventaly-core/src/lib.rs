//! Domain layer between `ventaly-api` and its consumers (the CLI, or any
//! home-automation host).
//!
//! - **[`Device`]**: One appliance. Detects which API dialect it speaks
//!   ([`detect_api()`](Device::detect_api)), learns its identity
//!   ([`init()`](Device::init)), and maps replies into [`DeviceSnapshot`]s.
//!
//! - **[`Coordinator`]**: Single holder of a device's current state.
//!   Polls on an interval, serializes every exchange with the appliance
//!   behind one update lock, and publishes immutable snapshots through an
//!   atomic pointer so readers never block.
//!
//! - **[`ControlAction`]**: Typed control requests, rendered into the body
//!   shape the active dialect expects.
//!
//! - **Model** ([`model`]): Snapshots, identity, the closed device-type set
//!   and a per-model capability registry; [`maintenance`] turns raw
//!   counters into minutes and days-left.

pub mod action;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod maintenance;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{ControlAction, LedColour, LedStripMode, TIMER_HOURS};
pub use config::{CoordinatorConfig, DeviceConfig};
pub use coordinator::{Coordinator, UpdateState};
pub use device::Device;
pub use error::CoreError;
pub use maintenance::{CounterReading, CounterSpec, TickResolution};
pub use model::{
    Capabilities, DeviceIdentity, DeviceInfo, DeviceSnapshot, DeviceType, FanMode, WarningBit,
};

// Wire-level types consumers commonly need alongside the core.
pub use ventaly_api::{ApiVersion, DialectDefinition, Payload, TransportConfig};
