//! Transport abstraction over the BLE platform
//!
//! The link manager is written against these two traits so its connection
//! lifecycle can be driven by a fake in tests. [`BleTransport`] is the real
//! implementation over btleplug.

use std::future::Future;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LinkError;

/// Invoked once when the platform reports a device-initiated disconnect.
pub type DisconnectCallback = Box<dyn Fn() + Send + Sync>;

/// An established link to the device.
pub trait Connection: Send + Sync + 'static {
    fn read(
        &self,
        characteristic: Uuid,
    ) -> impl Future<Output = Result<Vec<u8>, LinkError>> + Send;

    fn write(
        &self,
        characteristic: Uuid,
        data: &[u8],
        ack: bool,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), LinkError>> + Send;

    fn is_connected(&self) -> impl Future<Output = bool> + Send;
}

/// Platform primitives for finding and connecting to the device.
pub trait Transport: Send + Sync + 'static {
    type Handle: Send + Sync;
    type Conn: Connection;

    /// Resolve an address against the platform's discovery cache and
    /// currently-known advertisements. `Ok(None)` means the device is not
    /// visible right now.
    fn resolve(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Self::Handle>, LinkError>> + Send;

    /// Establish a connection with a bounded number of low-level attempts and
    /// a fixed per-attempt timeout.
    fn connect(
        &self,
        handle: &Self::Handle,
        name: &str,
        on_disconnect: DisconnectCallback,
        max_attempts: u32,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Conn, LinkError>> + Send;
}

/// btleplug-backed transport. Holds the adapter and keeps a scan running so
/// the discovery cache stays populated.
pub struct BleTransport {
    adapter: Adapter,
}

impl BleTransport {
    pub async fn new() -> Result<Self, LinkError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(LinkError::NoAdapter)?;
        adapter.start_scan(ScanFilter::default()).await?;
        Ok(Self { adapter })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}

impl Transport for BleTransport {
    type Handle = Peripheral;
    type Conn = BleConnection;

    async fn resolve(&self, address: &str) -> Result<Option<Peripheral>, LinkError> {
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.address().to_string().eq_ignore_ascii_case(address) {
                return Ok(Some(peripheral));
            }
        }
        debug!(address, "device not in discovery cache");
        Ok(None)
    }

    async fn connect(
        &self,
        handle: &Peripheral,
        name: &str,
        on_disconnect: DisconnectCallback,
        max_attempts: u32,
        timeout: Duration,
    ) -> Result<BleConnection, LinkError> {
        let mut last_err = LinkError::DeviceUnreachable(name.to_string());
        for attempt in 1..=max_attempts.max(1) {
            match tokio::time::timeout(timeout, handle.connect()).await {
                Ok(Ok(())) => {
                    handle.discover_services().await?;
                    let watcher =
                        spawn_disconnect_watcher(&self.adapter, handle.id(), on_disconnect).await?;
                    return Ok(BleConnection {
                        peripheral: handle.clone(),
                        watcher,
                    });
                }
                Ok(Err(e)) => {
                    debug!(name, attempt, error = %e, "connect attempt failed");
                    last_err = e.into();
                }
                Err(_) => {
                    debug!(name, attempt, "connect attempt timed out");
                }
            }
        }
        Err(last_err)
    }
}

/// Watch the central event stream and fire the callback on the first
/// disconnect event for this peripheral.
async fn spawn_disconnect_watcher(
    adapter: &Adapter,
    id: PeripheralId,
    on_disconnect: DisconnectCallback,
) -> Result<JoinHandle<()>, LinkError> {
    let mut events = adapter.events().await?;
    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let CentralEvent::DeviceDisconnected(gone) = event {
                if gone == id {
                    on_disconnect();
                    return;
                }
            }
        }
    }))
}

pub struct BleConnection {
    peripheral: Peripheral,
    watcher: JoinHandle<()>,
}

impl BleConnection {
    fn characteristic(&self, uuid: Uuid) -> Result<btleplug::api::Characteristic, LinkError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(LinkError::CharacteristicMissing(uuid))
    }
}

impl Connection for BleConnection {
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, LinkError> {
        let c = self.characteristic(characteristic)?;
        Ok(self.peripheral.read(&c).await?)
    }

    async fn write(&self, characteristic: Uuid, data: &[u8], ack: bool) -> Result<(), LinkError> {
        let c = self.characteristic(characteristic)?;
        let mode = if ack {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        Ok(self.peripheral.write(&c, data, mode).await?)
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.watcher.abort();
        if let Err(e) = self.peripheral.disconnect().await {
            warn!(error = %e, "error during disconnect");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }
}

impl Drop for BleConnection {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
