//! Scene messages: notices, timers, forecasts
//!
//! Encode-only. The device never echoes scene payloads back, so no decode
//! path exists for these.

use crate::wire;

/// Display text plus its style modifier bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextData {
    /// Icon-encoded text bytes, see [`crate::text::text_with_icons`].
    pub text: Vec<u8>,
    pub modifiers: u32,
}

impl TextData {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.text.len());
        wire::put_bytes(&mut buf, 1, &self.text);
        wire::put_uint(&mut buf, 2, self.modifiers as u64);
        buf
    }
}

/// A one-shot notification scene.
#[derive(Debug, Clone, Default)]
pub struct Notice {
    pub animation: u32,
    pub sound: u32,
    pub color: u32,
    pub text: TextData,
}

impl Notice {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        wire::put_uint(&mut buf, 1, self.animation as u64);
        wire::put_uint(&mut buf, 2, self.sound as u64);
        wire::put_uint(&mut buf, 3, self.color as u64);
        wire::put_message(&mut buf, 4, &self.text.to_bytes());
        buf
    }
}

/// One stage of a multi-stage timer.
#[derive(Debug, Clone, Default)]
pub struct TimerInterval {
    pub duration: u32,
    pub countdown: u32,
    pub text: Vec<TextData>,
}

impl TimerInterval {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        wire::put_uint(&mut buf, 1, self.duration as u64);
        wire::put_uint(&mut buf, 2, self.countdown as u64);
        for t in &self.text {
            wire::put_message(&mut buf, 3, &t.to_bytes());
        }
        buf
    }
}

/// A countdown timer scene.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    pub countdown: u32,
    pub intervals: Vec<TimerInterval>,
    pub final_text: Vec<TextData>,
}

impl Timer {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        wire::put_uint(&mut buf, 1, self.countdown as u64);
        for interval in &self.intervals {
            wire::put_message(&mut buf, 2, &interval.to_bytes());
        }
        for t in &self.final_text {
            wire::put_message(&mut buf, 3, &t.to_bytes());
        }
        buf
    }
}

/// A 24-hour temperature forecast scene.
#[derive(Debug, Clone, Default)]
pub struct ForecastScene {
    /// Scene start, local-adjusted epoch seconds.
    pub timestamp: u64,
    pub max: i32,
    pub min: i32,
    pub max_color: u32,
    pub min_color: u32,
    /// 24 temperatures packed as little-endian i16, 48 bytes.
    pub values: Vec<u8>,
    /// Display template bytes shown alongside the gradient.
    pub template: Vec<u8>,
}

impl ForecastScene {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + self.values.len() + self.template.len());
        wire::put_uint(&mut buf, 1, self.timestamp);
        wire::put_sint(&mut buf, 2, self.max);
        wire::put_sint(&mut buf, 3, self.min);
        wire::put_uint(&mut buf, 4, self.max_color as u64);
        wire::put_uint(&mut buf, 5, self.min_color as u64);
        wire::put_bytes(&mut buf, 6, &self.values);
        wire::put_bytes(&mut buf, 7, &self.template);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_carries_text_field() {
        let notice = Notice {
            animation: 1,
            sound: 0,
            color: 12,
            text: TextData {
                text: vec![0x48, 0x69],
                modifiers: 0,
            },
        };
        let bytes = notice.to_bytes();
        // animation field omitted-sound, then color, then the text submessage
        // containing "Hi": tag 0x22 (field 4, len-delimited).
        assert!(bytes.windows(2).any(|w| w == [0x48, 0x69]));
        assert!(bytes.contains(&0x22));
        // sound == 0 is omitted: no field-2 varint tag 0x10
        assert!(!bytes.contains(&0x10));
    }

    #[test]
    fn empty_text_submessage_still_present() {
        let notice = Notice::default();
        let bytes = notice.to_bytes();
        assert_eq!(bytes, vec![0x22, 0x00]);
    }

    #[test]
    fn timer_encodes_intervals_in_order() {
        let timer = Timer {
            countdown: 60,
            intervals: vec![
                TimerInterval {
                    duration: 30,
                    countdown: 1,
                    text: vec![TextData {
                        text: b"go".to_vec(),
                        modifiers: 0,
                    }],
                },
                TimerInterval {
                    duration: 30,
                    countdown: 0,
                    text: vec![],
                },
            ],
            final_text: vec![TextData {
                text: b"done".to_vec(),
                modifiers: 0,
            }],
        };
        let bytes = timer.to_bytes();
        assert_eq!(bytes[0], 0x08); // countdown tag
        assert_eq!(bytes[1], 60);
        let first = bytes.windows(2).position(|w| w == b"go").unwrap();
        let second = bytes.windows(4).position(|w| w == b"done").unwrap();
        assert!(first < second);
    }

    #[test]
    fn forecast_scene_negative_temps() {
        let scene = ForecastScene {
            timestamp: 1_700_000_000,
            max: 5,
            min: -10,
            max_color: 0xff0000,
            min_color: 0x0000ff,
            values: vec![0; 48],
            template: vec![194, 143, 8, 194, 176, 67],
        };
        let bytes = scene.to_bytes();
        // sint32 zigzag: -10 -> 19, 5 -> 10
        assert!(bytes.windows(2).any(|w| w == [0x10, 10]));
        assert!(bytes.windows(2).any(|w| w == [0x18, 19]));
    }
}
