//! BLE GATT identifiers for the Glance Clock
//!
//! The clock exposes a single custom service. Commands are written to the
//! command characteristic; the same characteristic answers a read with the
//! current device settings.

/// Glance Clock service UUID
pub const SERVICE_UUID: &str = "5075f606-1e0e-11e7-93ae-92361f002671";

/// Command + settings characteristic UUID (write commands, read settings)
pub const COMMAND_UUID: &str = "5075fb2e-1e0e-11e7-93ae-92361f002671";

/// Scene data characteristic UUID
pub const SCENE_DATA_UUID: &str = "5075ffac-1e0e-11e7-93ae-92361f002671";

/// Scene state characteristic UUID
pub const SCENE_STATE_UUID: &str = "5075fc78-1e0e-11e7-93ae-92361f002671";
