//! Device settings message
//!
//! The nine device flags travel together as one message: a snapshot is never
//! partially encoded or partially decoded. A settings read may come back in
//! three framings depending on firmware and transport path; all three carry
//! the same payload.

use crate::wire::{self, DecodeError, Reader, WIRE_VARINT};

/// ASCII tag some firmware revisions prepend to the settings response.
const DATA_TAG: &[u8; 4] = b"Data";
/// Leading length/type byte in the short framing variant.
const SETTINGS_MARKER: u8 = 0x05;

/// Immutable snapshot of the clock's nine settings fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub night_mode_enabled: bool,
    pub points_always_enabled: bool,
    pub display_brightness: u8,
    pub time_mode_enabled: bool,
    pub time_format_12: bool,
    pub permanent_dnd: bool,
    pub permanent_mute: bool,
    /// Date display format, 0 (disabled) through 4.
    pub date_format: u8,
    /// Manager user-activity timeout in seconds.
    pub user_activity_timeout: u32,
}

impl Settings {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        wire::put_bool(&mut buf, 1, self.night_mode_enabled);
        wire::put_bool(&mut buf, 2, self.points_always_enabled);
        wire::put_uint(&mut buf, 3, self.display_brightness as u64);
        wire::put_bool(&mut buf, 4, self.time_mode_enabled);
        wire::put_bool(&mut buf, 5, self.time_format_12);
        wire::put_bool(&mut buf, 6, self.permanent_dnd);
        wire::put_bool(&mut buf, 7, self.permanent_mute);
        wire::put_uint(&mut buf, 8, self.date_format as u64);
        wire::put_uint(&mut buf, 9, self.user_activity_timeout as u64);
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut settings = Settings::default();
        let mut r = Reader::new(data);
        while !r.done() {
            let (field, wire_type) = r.next_field()?;
            if wire_type != WIRE_VARINT {
                r.skip(wire_type)?;
                continue;
            }
            let v = r.varint()?;
            match field {
                1 => settings.night_mode_enabled = v != 0,
                2 => settings.points_always_enabled = v != 0,
                3 => settings.display_brightness = v.min(255) as u8,
                4 => settings.time_mode_enabled = v != 0,
                5 => settings.time_format_12 = v != 0,
                6 => settings.permanent_dnd = v != 0,
                7 => settings.permanent_mute = v != 0,
                8 => settings.date_format = v.min(255) as u8,
                9 => settings.user_activity_timeout = v.min(u32::MAX as u64) as u32,
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Decode a raw settings characteristic read, stripping whichever framing
    /// variant the device used.
    pub fn from_response(raw: &[u8]) -> Result<Self, DecodeError> {
        Self::from_bytes(strip_response_framing(raw)?)
    }
}

/// Detect and strip the response framing: a 4-byte `"Data"` tag plus one
/// filler byte, a single `0x05` length/type byte, or no framing at all.
pub fn strip_response_framing(raw: &[u8]) -> Result<&[u8], DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }
    if raw.len() >= 5 && &raw[..4] == DATA_TAG {
        return Ok(&raw[5..]);
    }
    if raw[0] == SETTINGS_MARKER {
        return Ok(&raw[1..]);
    }
    Ok(raw)
}
