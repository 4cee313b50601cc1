// ── Domain model ──
//
// Snapshot, identity and per-model data. Everything here is plain data,
// built from decoded device responses.

pub mod capabilities;
pub mod device_type;
pub mod identity;
pub mod snapshot;

pub use capabilities::{Capabilities, FanMode, WarningBit};
pub use device_type::DeviceType;
pub use identity::{DeviceIdentity, DeviceInfo};
pub use snapshot::DeviceSnapshot;
