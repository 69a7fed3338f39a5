//! Command façade
//!
//! Builds command frames and dispatches them through the link manager. Owns
//! the settings read-modify-write merge and the brightness-preview choreography
//! the firmware expects around a settings write.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use glance_proto::command::{
    OP_BRIGHTNESS_SCENE_START, OP_BRIGHTNESS_SCENE_STOP, OP_CALIBRATE_CONFIRM, OP_CALIBRATE_START,
    OP_REFRESH_DATA,
};
use glance_proto::{
    CommandFrame, ForecastScene, Notice, Settings, TextData, Timer, TimerInterval,
    control_command, text_with_icons,
};

use crate::error::LinkError;
use crate::link::{LinkManager, command_characteristic};
use crate::transport::Transport;

/// Base snapshot used when the device's settings cannot be read before a
/// write. Matches the factory defaults.
pub const DEFAULT_SETTINGS: Settings = Settings {
    night_mode_enabled: true,
    points_always_enabled: false,
    display_brightness: 128,
    time_mode_enabled: true,
    time_format_12: false,
    permanent_dnd: false,
    permanent_mute: false,
    date_format: 0,
    user_activity_timeout: 600,
};

/// Delay before leaving brightness-preview mode after a brightness write.
const BRIGHTNESS_SCENE_STOP_DELAY: Duration = Duration::from_secs(3);

/// Notice parameters, pre-resolved to the device's numeric encodings by the
/// caller layer.
#[derive(Debug, Clone)]
pub struct NoticeOptions {
    pub animation: u32,
    pub sound: u32,
    pub color: u32,
    pub priority: u8,
    pub text_modifiers: u32,
}

impl Default for NoticeOptions {
    /// Pulse animation, no sound, white, medium priority.
    fn default() -> Self {
        Self {
            animation: 1,
            sound: 0,
            color: 12,
            priority: 16,
            text_modifiers: 0,
        }
    }
}

/// One stage of a timer.
#[derive(Debug, Clone)]
pub struct TimerIntervalSpec {
    pub text: String,
    pub duration: u32,
    pub countdown: u32,
}

/// Partial settings update. `None` fields keep the device's current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub night_mode_enabled: Option<bool>,
    pub points_always_enabled: Option<bool>,
    pub display_brightness: Option<u8>,
    pub time_mode_enabled: Option<bool>,
    pub time_format_12: Option<bool>,
    pub permanent_dnd: Option<bool>,
    pub permanent_mute: Option<bool>,
    pub date_format: Option<u8>,
    pub user_activity_timeout: Option<u32>,
}

impl SettingsPatch {
    /// Last-write-wins per field over `base`.
    pub fn apply(&self, base: Settings) -> Settings {
        Settings {
            night_mode_enabled: self.night_mode_enabled.unwrap_or(base.night_mode_enabled),
            points_always_enabled: self
                .points_always_enabled
                .unwrap_or(base.points_always_enabled),
            display_brightness: self.display_brightness.unwrap_or(base.display_brightness),
            time_mode_enabled: self.time_mode_enabled.unwrap_or(base.time_mode_enabled),
            time_format_12: self.time_format_12.unwrap_or(base.time_format_12),
            permanent_dnd: self.permanent_dnd.unwrap_or(base.permanent_dnd),
            permanent_mute: self.permanent_mute.unwrap_or(base.permanent_mute),
            date_format: self.date_format.unwrap_or(base.date_format),
            user_activity_timeout: self
                .user_activity_timeout
                .unwrap_or(base.user_activity_timeout),
        }
    }

    pub fn is_brightness_change(&self) -> bool {
        self.display_brightness.is_some()
    }
}

/// The caller-facing command service for one clock.
pub struct GlanceClient<T: Transport> {
    link: Arc<LinkManager<T>>,
}

impl<T: Transport> GlanceClient<T> {
    pub fn new(link: Arc<LinkManager<T>>) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &Arc<LinkManager<T>> {
        &self.link
    }

    /// Show a notice. `text` may embed `[icon:N]` markers.
    pub async fn send_notice(&self, text: &str, opts: &NoticeOptions) -> Result<(), LinkError> {
        let notice = Notice {
            animation: opts.animation,
            sound: opts.sound,
            color: opts.color,
            text: TextData {
                text: text_with_icons(text),
                modifiers: opts.text_modifiers,
            },
        };
        let frame = CommandFrame::notice(opts.priority, notice.to_bytes());
        info!(
            device = %self.link.name(),
            text,
            animation = opts.animation,
            priority = opts.priority,
            "sending notice"
        );
        self.link.send(&frame.to_bytes()).await
    }

    /// Notification convenience: `"title: body"` with the given options.
    pub async fn send_message(
        &self,
        title: &str,
        body: &str,
        opts: &NoticeOptions,
    ) -> Result<(), LinkError> {
        let text = if title.is_empty() {
            body.to_string()
        } else {
            format!("{title}: {body}")
        };
        self.send_notice(&text, opts).await
    }

    /// Start a countdown timer with optional interval stages and final text.
    pub async fn send_timer(
        &self,
        countdown: u32,
        intervals: &[TimerIntervalSpec],
        final_text: &[String],
    ) -> Result<(), LinkError> {
        let timer = Timer {
            countdown,
            intervals: intervals
                .iter()
                .map(|spec| TimerInterval {
                    duration: spec.duration,
                    countdown: spec.countdown,
                    text: vec![TextData {
                        text: text_with_icons(&spec.text),
                        modifiers: 0,
                    }],
                })
                .collect(),
            final_text: final_text
                .iter()
                .map(|t| TextData {
                    text: text_with_icons(t),
                    modifiers: 0,
                })
                .collect(),
        };
        info!(
            device = %self.link.name(),
            countdown,
            intervals = intervals.len(),
            "sending timer"
        );
        self.link
            .send(&CommandFrame::timer(timer.to_bytes()).to_bytes())
            .await
    }

    /// Upload a forecast scene. The priming command is best-effort; the
    /// forecast frame itself decides success.
    pub async fn send_forecast(&self, scene: &ForecastScene) -> Result<(), LinkError> {
        if let Err(e) = self.send_control(OP_REFRESH_DATA).await {
            debug!(error = %e, "priming before forecast failed, continuing");
        }
        info!(
            device = %self.link.name(),
            min = scene.min,
            max = scene.max,
            "sending forecast"
        );
        self.link
            .send(&CommandFrame::forecast(scene.to_bytes()).to_bytes())
            .await
    }

    /// Read the current settings, preferring the cache while fresh.
    pub async fn read_settings(&self) -> Result<Settings, LinkError> {
        if let Some(cached) = self.link.cached_settings() {
            debug!(device = %self.link.name(), "using cached settings");
            return Ok(cached);
        }
        let raw = self.link.read(command_characteristic()).await?;
        let settings = Settings::from_response(&raw)?;
        self.link.cache_settings(settings);
        Ok(settings)
    }

    /// Read-modify-write settings update.
    ///
    /// Primes the device (brightness changes use the preview-scene command),
    /// merges the patch over the current snapshot (factory defaults if the
    /// read fails), writes the full nine-field frame, and for brightness
    /// changes schedules the preview-stop command after a fixed delay.
    pub async fn write_settings(&self, patch: &SettingsPatch) -> Result<(), LinkError> {
        let brightness_change = patch.is_brightness_change();
        let priming = if brightness_change {
            OP_BRIGHTNESS_SCENE_START
        } else {
            OP_REFRESH_DATA
        };
        if let Err(e) = self.send_control(priming).await {
            debug!(error = %e, "priming command failed, continuing");
        }

        let base = match self.read_settings().await {
            Ok(current) => current,
            Err(e) => {
                debug!(error = %e, "settings read failed, using defaults as base");
                DEFAULT_SETTINGS
            }
        };
        let merged = patch.apply(base);

        info!(device = %self.link.name(), ?patch, "writing settings");
        self.link
            .send(&CommandFrame::settings(merged.to_bytes()).to_bytes())
            .await?;
        // A successful write supersedes whatever the cache held.
        self.link.cache_settings(merged);

        if brightness_change {
            let link = Arc::clone(&self.link);
            tokio::spawn(async move {
                tokio::time::sleep(BRIGHTNESS_SCENE_STOP_DELAY).await;
                if let Err(e) = link.send(&control_command(OP_BRIGHTNESS_SCENE_STOP)).await {
                    error!(error = %e, "delayed brightness scene stop failed");
                }
            });
        }
        Ok(())
    }

    pub async fn calibrate_start(&self) -> Result<(), LinkError> {
        self.send_control(OP_CALIBRATE_START).await
    }

    pub async fn calibrate_confirm(&self) -> Result<(), LinkError> {
        self.send_control(OP_CALIBRATE_CONFIRM).await
    }

    async fn send_control(&self, opcode: u8) -> Result<(), LinkError> {
        self.link.send(&control_command(opcode)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    use crate::transport::{Connection, DisconnectCallback};

    /// A cooperative device fake: records every written frame and answers
    /// settings reads by echoing the last settings write.
    #[derive(Default)]
    struct EchoDevice {
        writes: Mutex<Vec<Vec<u8>>>,
        reads: Mutex<u32>,
        settings: Mutex<Settings>,
        /// Framing applied to settings reads: 0 = bare, 1 = 0x05, 2 = "Data".
        framing: Mutex<u8>,
    }

    #[derive(Clone, Default)]
    struct EchoTransport {
        device: Arc<EchoDevice>,
    }

    struct EchoConn {
        device: Arc<EchoDevice>,
    }

    impl Connection for EchoConn {
        async fn read(&self, _c: Uuid) -> Result<Vec<u8>, LinkError> {
            *self.device.reads.lock().unwrap() += 1;
            let payload = self.device.settings.lock().unwrap().to_bytes();
            let framed = match *self.device.framing.lock().unwrap() {
                1 => {
                    let mut v = vec![0x05];
                    v.extend_from_slice(&payload);
                    v
                }
                2 => {
                    let mut v = b"Data\x00".to_vec();
                    v.extend_from_slice(&payload);
                    v
                }
                _ => payload,
            };
            Ok(framed)
        }

        async fn write(&self, _c: Uuid, data: &[u8], _ack: bool) -> Result<(), LinkError> {
            if data.len() > 4 && data[0] == glance_proto::command::OP_SETTINGS {
                *self.device.settings.lock().unwrap() = Settings::from_bytes(&data[4..])?;
            }
            self.device.writes.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), LinkError> {
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    impl Transport for EchoTransport {
        type Handle = ();
        type Conn = EchoConn;

        async fn resolve(&self, _address: &str) -> Result<Option<()>, LinkError> {
            Ok(Some(()))
        }

        async fn connect(
            &self,
            _handle: &(),
            _name: &str,
            _on_disconnect: DisconnectCallback,
            _max_attempts: u32,
            _timeout: Duration,
        ) -> Result<EchoConn, LinkError> {
            Ok(EchoConn {
                device: Arc::clone(&self.device),
            })
        }
    }

    async fn client() -> (GlanceClient<EchoTransport>, Arc<EchoDevice>) {
        let transport = EchoTransport::default();
        let device = Arc::clone(&transport.device);
        *device.settings.lock().unwrap() = DEFAULT_SETTINGS;
        let link = Arc::new(LinkManager::new(transport, "AA:BB:CC:DD:EE:FF", "Clock"));
        link.connect().await.unwrap();
        (GlanceClient::new(link), device)
    }

    fn opcodes(device: &EchoDevice) -> Vec<u8> {
        device.writes.lock().unwrap().iter().map(|w| w[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn notice_wire_layout() {
        let (client, device) = client().await;
        client
            .send_notice("Temp [icon:3]C", &NoticeOptions::default())
            .await
            .unwrap();

        let writes = device.writes.lock().unwrap();
        let frame = writes.last().unwrap();
        assert_eq!(&frame[..4], &[0x02, 0x10, 0x00, 0x00]);
        let expected_text = [0x54, 0x65, 0x6d, 0x70, 0x20, 0x03, 0x43];
        assert!(
            frame
                .windows(expected_text.len())
                .any(|w| w == expected_text)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_then_read_preserves_untouched_fields() {
        let (client, _device) = client().await;
        let patch = SettingsPatch {
            time_format_12: Some(true),
            date_format: Some(3),
            ..SettingsPatch::default()
        };
        client.write_settings(&patch).await.unwrap();

        // Force the read to hit the device, not the cache.
        client.link().clear_settings_cache();
        let after = client.read_settings().await.unwrap();

        assert!(after.time_format_12);
        assert_eq!(after.date_format, 3);
        // Everything else still matches the pre-write snapshot.
        assert_eq!(after.night_mode_enabled, DEFAULT_SETTINGS.night_mode_enabled);
        assert_eq!(after.display_brightness, DEFAULT_SETTINGS.display_brightness);
        assert_eq!(
            after.user_activity_timeout,
            DEFAULT_SETTINGS.user_activity_timeout
        );
    }

    #[tokio::test(start_paused = true)]
    async fn settings_write_primes_with_refresh() {
        let (client, device) = client().await;
        client
            .write_settings(&SettingsPatch {
                permanent_mute: Some(true),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();

        let ops = opcodes(&device);
        assert_eq!(ops[0], OP_REFRESH_DATA);
        assert_eq!(*ops.last().unwrap(), glance_proto::command::OP_SETTINGS);
    }

    #[tokio::test(start_paused = true)]
    async fn brightness_write_uses_preview_scene() {
        let (client, device) = client().await;
        client
            .write_settings(&SettingsPatch {
                display_brightness: Some(200),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();

        assert_eq!(opcodes(&device)[0], OP_BRIGHTNESS_SCENE_START);

        // The preview-stop command lands after the fixed delay.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(*opcodes(&device).last().unwrap(), OP_BRIGHTNESS_SCENE_STOP);
        assert_eq!(
            device.settings.lock().unwrap().display_brightness,
            200
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_settings_strips_any_framing() {
        let (client, device) = client().await;
        for framing in [0u8, 1, 2] {
            *device.framing.lock().unwrap() = framing;
            client.link().clear_settings_cache();
            let settings = client.read_settings().await.unwrap();
            assert_eq!(settings, DEFAULT_SETTINGS, "framing {framing}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn read_settings_uses_cache_within_ttl() {
        let (client, device) = client().await;
        client.read_settings().await.unwrap();
        assert_eq!(*device.reads.lock().unwrap(), 1);

        // Second read inside the TTL goes to the cache, not the device.
        client.read_settings().await.unwrap();
        assert_eq!(*device.reads.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forecast_send_is_primed() {
        let (client, device) = client().await;
        let scene = ForecastScene {
            timestamp: 1_700_000_000,
            max: 20,
            min: 10,
            max_color: 0xff0000,
            min_color: 0x0000ff,
            values: vec![0; 48],
            template: vec![1, 2, 3],
        };
        client.send_forecast(&scene).await.unwrap();

        let ops = opcodes(&device);
        assert_eq!(ops, vec![OP_REFRESH_DATA, glance_proto::command::OP_FORECAST]);

        let writes = device.writes.lock().unwrap();
        let frame = writes.last().unwrap();
        assert_eq!(&frame[..4], &[0x07, 16, 24, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_frame_has_timer_opcode() {
        let (client, device) = client().await;
        client
            .send_timer(
                90,
                &[TimerIntervalSpec {
                    text: "work".into(),
                    duration: 60,
                    countdown: 1,
                }],
                &["done".to_string()],
            )
            .await
            .unwrap();

        let writes = device.writes.lock().unwrap();
        let frame = writes.last().unwrap();
        assert_eq!(&frame[..4], &[0x03, 0, 0, 0]);
        assert!(frame.windows(4).any(|w| w == b"work"));
        assert!(frame.windows(4).any(|w| w == b"done"));
    }

    #[tokio::test(start_paused = true)]
    async fn message_joins_title_and_body() {
        let (client, device) = client().await;
        client
            .send_message("Home", "door open", &NoticeOptions::default())
            .await
            .unwrap();

        let writes = device.writes.lock().unwrap();
        let frame = writes.last().unwrap();
        let expected = text_with_icons("Home: door open");
        assert!(frame.windows(expected.len()).any(|w| w == expected));
    }
}
