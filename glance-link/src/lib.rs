//! Connection management and high-level commands for Glance Clock devices.
//!
//! [`LinkManager`] owns one device link: it connects on demand, runs a
//! periodic health probe, and recovers from drops with linear backoff.
//! [`GlanceClient`] sits on top and speaks the command protocol: notices,
//! timers, forecast scenes, settings, and calibration.
//!
//! The BLE layer is behind the [`Transport`] trait so everything above it is
//! testable without radio hardware; [`BleTransport`] is the production
//! implementation.

pub mod client;
pub mod color;
pub mod error;
pub mod forecast;
pub mod link;
pub mod transport;

pub use client::{
    DEFAULT_SETTINGS, GlanceClient, NoticeOptions, SettingsPatch, TimerIntervalSpec,
};
pub use color::{ColorInput, interpolate_color, parse_color};
pub use error::LinkError;
pub use forecast::{ForecastOptions, HourlyReading, build_forecast};
pub use link::{ConnectionListener, LinkConfig, LinkManager};
pub use transport::{BleTransport, Connection, Transport};

pub use glance_proto::Settings;
