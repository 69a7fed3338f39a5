//! Glance Clock wire protocol - command framing and scene encoding
//!
//! Every command written to the clock's command characteristic is a fixed
//! opcode header followed by an optional protobuf-encoded payload. This crate
//! owns that byte layout: the header framing, the message encoders, and the
//! decoder for the settings characteristic response.

pub mod ble;
pub mod command;
pub mod scene;
pub mod settings;
pub mod text;
pub mod wire;

pub use command::{CommandFrame, control_command};
pub use scene::{ForecastScene, Notice, TextData, Timer, TimerInterval};
pub use settings::Settings;
pub use text::text_with_icons;
pub use wire::DecodeError;
