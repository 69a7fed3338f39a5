//! Connection lifecycle management
//!
//! One [`LinkManager`] per device. A background maintenance task keeps the
//! link alive: it reconnects when the device drops off, probes liveness with
//! a lightweight characteristic read every interval, and backs off linearly
//! on repeated connect failures before entering a long cooldown. The device
//! is never permanently abandoned.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use glance_proto::Settings;

use crate::error::LinkError;
use crate::transport::{Connection, DisconnectCallback, Transport};

/// Command/settings characteristic, parsed once from the protocol constants.
pub fn command_characteristic() -> Uuid {
    Uuid::parse_str(glance_proto::ble::COMMAND_UUID).expect("invalid UUID in glance_proto")
}

/// Timing and retry policy for one link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Pause between maintenance iterations; also the liveness probe period.
    pub health_check_interval: Duration,
    /// Linear backoff unit: attempt `n` waits `backoff_base * n`.
    pub backoff_base: Duration,
    /// Connect failures before the long cooldown kicks in.
    pub max_attempts: u32,
    /// Pause after `max_attempts` failures; the counter resets afterwards.
    pub cooldown: Duration,
    /// Per-attempt timeout for the low-level transport connect.
    pub connect_timeout: Duration,
    /// Low-level attempts inside a single transport connect.
    pub connect_attempts: u32,
    /// Maximum age of a cached settings snapshot.
    pub settings_ttl: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(60),
            backoff_base: Duration::from_secs(30),
            max_attempts: 3,
            cooldown: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            connect_attempts: 3,
            settings_ttl: Duration::from_secs(60),
        }
    }
}

/// Notified (in registration order, on a spawned task) after every successful
/// connect. Register before `start()`, deregister before your own teardown.
pub trait ConnectionListener: Send + Sync {
    fn on_connected(&self);
}

struct LinkState<C> {
    conn: Option<Arc<C>>,
    connecting: bool,
    attempts: u32,
}

struct SettingsCache {
    value: Option<Settings>,
    captured_at: Option<Instant>,
}

/// Owns the transport handle and the settings cache for one device.
pub struct LinkManager<T: Transport> {
    transport: T,
    address: String,
    name: String,
    config: LinkConfig,
    state: Arc<Mutex<LinkState<T::Conn>>>,
    cache: Mutex<SettingsCache>,
    listeners: Mutex<Vec<Arc<dyn ConnectionListener>>>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the `connecting` flag even if the connect future is cancelled, so
/// an aborted maintenance task never wedges the state machine.
struct ConnectingGuard<'a, C>(&'a Mutex<LinkState<C>>);

impl<C> Drop for ConnectingGuard<'_, C> {
    fn drop(&mut self) {
        self.0.lock().unwrap().connecting = false;
    }
}

impl<T: Transport> LinkManager<T> {
    pub fn new(transport: T, address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_config(transport, address, name, LinkConfig::default())
    }

    pub fn with_config(
        transport: T,
        address: impl Into<String>,
        name: impl Into<String>,
        config: LinkConfig,
    ) -> Self {
        Self {
            transport,
            address: address.into(),
            name: name.into(),
            config,
            state: Arc::new(Mutex::new(LinkState {
                conn: None,
                connecting: false,
                attempts: 0,
            })),
            cache: Mutex::new(SettingsCache {
                value: None,
                captured_at: None,
            }),
            listeners: Mutex::new(Vec::new()),
            maintenance: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Callback management

    pub fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    pub fn remove_connection_listener(&self, listener: &Arc<dyn ConnectionListener>) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    fn notify_connection_listeners(&self) {
        let listeners = self.listeners.lock().unwrap().clone();
        debug!(count = listeners.len(), "notifying connection listeners");
        for listener in listeners {
            // Spawned so a slow or panicking listener cannot block the
            // connect path or the listeners after it.
            tokio::spawn(async move { listener.on_connected() });
        }
    }

    // Settings cache

    /// Cached snapshot, if younger than the TTL.
    pub fn cached_settings(&self) -> Option<Settings> {
        let cache = self.cache.lock().unwrap();
        match (cache.value, cache.captured_at) {
            (Some(value), Some(at)) if at.elapsed() < self.config.settings_ttl => Some(value),
            _ => None,
        }
    }

    pub fn cache_settings(&self, settings: Settings) {
        let mut cache = self.cache.lock().unwrap();
        cache.value = Some(settings);
        cache.captured_at = Some(Instant::now());
    }

    pub fn clear_settings_cache(&self) {
        let mut cache = self.cache.lock().unwrap();
        cache.value = None;
        cache.captured_at = None;
    }

    // Connection state

    fn current_conn(&self) -> Option<Arc<T::Conn>> {
        self.state.lock().unwrap().conn.clone()
    }

    pub async fn is_connected(&self) -> bool {
        match self.current_conn() {
            Some(conn) => conn.is_connected().await,
            None => false,
        }
    }

    // Lifecycle

    /// Spawn the maintenance loop. Idempotent: a no-op while already running.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.maintenance.lock().unwrap();
        if task.is_some() {
            debug!(device = %self.name, "maintenance task already running");
            return;
        }
        debug!(device = %self.name, "starting link manager");
        let manager = Arc::clone(self);
        *task = Some(tokio::spawn(async move { manager.maintain().await }));
    }

    /// Cancel the maintenance loop and best-effort disconnect. Safe to call
    /// when never started.
    pub async fn stop(&self) {
        if let Some(task) = self.maintenance.lock().unwrap().take() {
            task.abort();
        }
        self.disconnect().await;
        debug!(device = %self.name, "link manager stopped");
    }

    async fn maintain(&self) {
        loop {
            if !self.is_connected().await {
                let connecting = self.state.lock().unwrap().connecting;
                if !connecting {
                    let _ = self.connect().await;
                }
            }

            tokio::time::sleep(self.config.health_check_interval).await;

            if let Some(conn) = self.current_conn() {
                match conn.read(command_characteristic()).await {
                    Ok(_) => {
                        self.state.lock().unwrap().attempts = 0;
                    }
                    Err(e) => {
                        warn!(device = %self.name, error = %e, "liveness probe failed");
                        self.disconnect().await;
                    }
                }
            }
        }
    }

    /// Establish the link. Re-entry while a connect (or its backoff sleep) is
    /// in flight returns immediately; the in-flight attempt owns the outcome.
    pub async fn connect(&self) -> Result<(), LinkError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.connecting {
                debug!(device = %self.name, "already connecting");
                return Ok(());
            }
            if state.conn.is_some() {
                return Ok(());
            }
            state.connecting = true;
        }
        let _guard = ConnectingGuard(&self.state);

        match self.establish().await {
            Ok(()) => {
                info!(device = %self.name, "connected");
                Ok(())
            }
            Err(e) => {
                let attempts = {
                    let mut state = self.state.lock().unwrap();
                    state.attempts += 1;
                    state.attempts
                };
                error!(
                    device = %self.name,
                    attempt = attempts,
                    max = self.config.max_attempts,
                    error = %e,
                    "connection failed"
                );
                if attempts < self.config.max_attempts {
                    let wait = self.config.backoff_base * attempts;
                    debug!(device = %self.name, ?wait, "waiting before retry");
                    tokio::time::sleep(wait).await;
                } else {
                    warn!(device = %self.name, "max attempts reached, entering cooldown");
                    tokio::time::sleep(self.config.cooldown).await;
                    self.state.lock().unwrap().attempts = 0;
                }
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), LinkError> {
        debug!(device = %self.name, address = %self.address, "connecting");

        let handle = self
            .transport
            .resolve(&self.address)
            .await?
            .ok_or_else(|| LinkError::DeviceUnreachable(self.address.clone()))?;

        let state = Arc::clone(&self.state);
        let name = self.name.clone();
        let on_disconnect: DisconnectCallback = Box::new(move || {
            warn!(device = %name, "disconnected unexpectedly");
            state.lock().unwrap().conn = None;
            // The maintenance loop notices on its next iteration.
        });

        let conn = self
            .transport
            .connect(
                &handle,
                &self.name,
                on_disconnect,
                self.config.connect_attempts,
                self.config.connect_timeout,
            )
            .await?;

        {
            let mut state = self.state.lock().unwrap();
            state.conn = Some(Arc::new(conn));
            state.attempts = 0;
        }
        self.notify_connection_listeners();
        Ok(())
    }

    /// Drop the link. Does not touch the retry counter: a reconnect after a
    /// probe failure or device-initiated disconnect runs at full priority.
    pub async fn disconnect(&self) {
        let conn = self.state.lock().unwrap().conn.take();
        if let Some(conn) = conn {
            debug!(device = %self.name, "disconnecting");
            let _ = conn.disconnect().await;
        }
    }

    // Characteristic I/O

    /// Write a command frame. Attempts one inline connect if the link is
    /// down; tries an acknowledged write first and falls back to an
    /// unacknowledged one. Any I/O failure forces a disconnect so the next
    /// operation starts from a clean state.
    pub async fn send(&self, data: &[u8]) -> Result<(), LinkError> {
        let mut conn = self.current_conn();
        if conn.is_none() {
            debug!(device = %self.name, "no active connection, attempting to connect");
            let _ = self.connect().await;
            conn = self.current_conn();
        }
        let Some(conn) = conn else {
            error!(device = %self.name, "failed to establish connection for command");
            return Err(LinkError::NotConnected(self.name.clone()));
        };

        let characteristic = command_characteristic();
        let result = match conn.write(characteristic, data, true).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(error = %e, "acknowledged write failed, retrying unacknowledged");
                conn.write(characteristic, data, false).await
            }
        };

        if let Err(e) = result {
            error!(device = %self.name, error = %e, "failed to send command");
            self.disconnect().await;
            return Err(e);
        }
        Ok(())
    }

    /// Read a characteristic. Fails when not connected; no implicit
    /// reconnect - reads are opportunistic.
    pub async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, LinkError> {
        let conn = self
            .current_conn()
            .ok_or_else(|| LinkError::NotConnected(self.name.clone()))?;
        conn.read(characteristic).await
    }
}
