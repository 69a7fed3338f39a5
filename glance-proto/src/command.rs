//! Command framing
//!
//! Scene commands are a 4-byte header `[opcode, param, param, param]`
//! followed by the protobuf payload. Control commands are a single opcode
//! byte with no payload.

/// Show a notice scene.
pub const OP_NOTICE: u8 = 0x02;
/// Start a timer scene.
pub const OP_TIMER: u8 = 0x03;
/// Write device settings.
pub const OP_SETTINGS: u8 = 0x05;
/// Upload a forecast scene.
pub const OP_FORECAST: u8 = 0x07;

/// Priming command sent before a settings or forecast write.
pub const OP_REFRESH_DATA: u8 = 35;
/// Put the display into brightness-preview mode before a brightness write.
pub const OP_BRIGHTNESS_SCENE_START: u8 = 61;
/// Leave brightness-preview mode.
pub const OP_BRIGHTNESS_SCENE_STOP: u8 = 60;
/// Begin display calibration.
pub const OP_CALIBRATE_START: u8 = 43;
/// Confirm display calibration.
pub const OP_CALIBRATE_CONFIRM: u8 = 44;

/// Forecast header params: medium scene priority, 24 hours, slot 1.
pub const FORECAST_PRIORITY: u8 = 16;
pub const FORECAST_HOURS: u8 = 24;
pub const FORECAST_SLOT: u8 = 1;

/// A headered command frame. Built per call, serialized, sent, discarded.
#[derive(Debug, Clone)]
pub struct CommandFrame {
    pub opcode: u8,
    pub params: [u8; 3],
    pub payload: Vec<u8>,
}

impl CommandFrame {
    pub fn notice(priority: u8, payload: Vec<u8>) -> Self {
        Self {
            opcode: OP_NOTICE,
            params: [priority, 0, 0],
            payload,
        }
    }

    pub fn timer(payload: Vec<u8>) -> Self {
        Self {
            opcode: OP_TIMER,
            params: [0, 0, 0],
            payload,
        }
    }

    pub fn settings(payload: Vec<u8>) -> Self {
        Self {
            opcode: OP_SETTINGS,
            params: [0, 0, 0],
            payload,
        }
    }

    pub fn forecast(payload: Vec<u8>) -> Self {
        Self {
            opcode: OP_FORECAST,
            params: [FORECAST_PRIORITY, FORECAST_HOURS, FORECAST_SLOT],
            payload,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.payload.len());
        buf.push(self.opcode);
        buf.extend_from_slice(&self.params);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// A bare one-byte control command (priming, calibration, scene control).
pub fn control_command(opcode: u8) -> Vec<u8> {
    vec![opcode]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_header() {
        let frame = CommandFrame::notice(16, vec![0xaa, 0xbb]);
        assert_eq!(frame.to_bytes(), vec![0x02, 0x10, 0x00, 0x00, 0xaa, 0xbb]);
    }

    #[test]
    fn forecast_header() {
        let frame = CommandFrame::forecast(vec![]);
        assert_eq!(frame.to_bytes(), vec![0x07, 16, 24, 1]);
    }

    #[test]
    fn control_is_single_byte() {
        assert_eq!(control_command(OP_REFRESH_DATA), vec![35]);
        assert_eq!(control_command(OP_BRIGHTNESS_SCENE_STOP), vec![60]);
    }
}
