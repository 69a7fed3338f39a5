//! Color conversion and gradient interpolation
//!
//! Pure helpers for the forecast gradient: packed 0xRRGGBB integers, lenient
//! caller input parsing, and linear interpolation over a numeric range.

/// Split a packed 0xRRGGBB color into channels.
pub fn hex_to_rgb(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

/// Pack RGB channels into 0xRRGGBB.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Caller-supplied color in any of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorInput {
    Packed(u32),
    /// Hex string, with or without a leading `#`.
    Hex(String),
    Rgb([u8; 3]),
}

/// Resolve a caller color to a packed value, falling back to `default` for
/// anything unparsable.
pub fn parse_color(input: Option<&ColorInput>, default: u32) -> u32 {
    match input {
        None => default,
        Some(ColorInput::Packed(v)) => *v,
        Some(ColorInput::Rgb([r, g, b])) => rgb_to_hex(*r, *g, *b),
        Some(ColorInput::Hex(s)) => {
            let hex = s.trim_start_matches('#');
            match u32::from_str_radix(hex, 16) {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(color = %s, "invalid color format, using default");
                    default
                }
            }
        }
    }
}

/// Linearly interpolate between two colors at `value` within `[min, max]`.
///
/// The factor is clamped to [0, 1], so values outside the range saturate at
/// the endpoint colors. A degenerate range returns `min_color`.
pub fn interpolate_color(value: f64, min: f64, max: f64, min_color: u32, max_color: u32) -> u32 {
    if max == min {
        return min_color;
    }
    let factor = ((value - min) / (max - min)).clamp(0.0, 1.0);

    let (min_r, min_g, min_b) = hex_to_rgb(min_color);
    let (max_r, max_g, max_b) = hex_to_rgb(max_color);

    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * factor) as u8;
    rgb_to_hex(lerp(min_r, max_r), lerp(min_g, max_g), lerp(min_b, max_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_rgb_round_trip() {
        assert_eq!(hex_to_rgb(0xff8001), (0xff, 0x80, 0x01));
        assert_eq!(rgb_to_hex(0xff, 0x80, 0x01), 0xff8001);
    }

    #[test]
    fn parse_accepts_all_shapes() {
        assert_eq!(parse_color(None, 0x123456), 0x123456);
        assert_eq!(parse_color(Some(&ColorInput::Packed(7)), 0), 7);
        assert_eq!(parse_color(Some(&ColorInput::Rgb([1, 2, 3])), 0), 0x010203);
        assert_eq!(
            parse_color(Some(&ColorInput::Hex("#FF0000".into())), 0),
            0xff0000
        );
        assert_eq!(
            parse_color(Some(&ColorInput::Hex("00ff00".into())), 0),
            0x00ff00
        );
        assert_eq!(
            parse_color(Some(&ColorInput::Hex("nope".into())), 0xabcdef),
            0xabcdef
        );
    }

    #[test]
    fn endpoints_return_endpoint_colors() {
        assert_eq!(interpolate_color(0.0, 0.0, 30.0, 0x0000ff, 0xff0000), 0x0000ff);
        assert_eq!(interpolate_color(30.0, 0.0, 30.0, 0x0000ff, 0xff0000), 0xff0000);
    }

    #[test]
    fn midpoint_is_componentwise_mean() {
        let mid = interpolate_color(15.0, 0.0, 30.0, 0x000000, 0xfe80fe);
        assert_eq!(mid, rgb_to_hex(0x7f, 0x40, 0x7f));
    }

    #[test]
    fn out_of_range_values_saturate() {
        assert_eq!(
            interpolate_color(-40.0, 0.0, 30.0, 0x0000ff, 0xff0000),
            0x0000ff
        );
        assert_eq!(
            interpolate_color(99.0, 0.0, 30.0, 0x0000ff, 0xff0000),
            0xff0000
        );
    }

    #[test]
    fn degenerate_range_returns_min_color() {
        assert_eq!(interpolate_color(5.0, 10.0, 10.0, 0x112233, 0x445566), 0x112233);
    }
}
