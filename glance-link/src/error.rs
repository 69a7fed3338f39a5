//! Link-level error taxonomy
//!
//! Transport failures are retried by the maintenance loop and reach callers
//! only as `Err`; decode failures mean "settings unavailable this cycle"; a
//! missing characteristic is a hard failure for the operation that needed it
//! but does not tear the connection down.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No resolvable device handle for the configured address.
    #[error("device {0} is not reachable")]
    DeviceUnreachable(String),

    /// An operation needed a live link and none exists.
    #[error("not connected to {0}")]
    NotConnected(String),

    /// Underlying BLE stack failure.
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No usable Bluetooth adapter on this host.
    #[error("no bluetooth adapter found")]
    NoAdapter,

    /// Transport failure reported by a non-BLE transport (tests, fakes).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Expected GATT characteristic missing from the device's service table.
    #[error("characteristic {0} not found")]
    CharacteristicMissing(Uuid),

    /// Malformed characteristic payload.
    #[error("decode failed: {0}")]
    Decode(#[from] glance_proto::DecodeError),

    /// External forecast source supplied no usable data.
    #[error("no forecast data available")]
    NoForecastData,
}
