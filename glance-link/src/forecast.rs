//! Forecast pipeline
//!
//! Turns an externally-sourced hourly temperature series into the fixed
//! 24-slot scene the clock expects: slot 0 is "now", slots 1-23 are the
//! forecast tail, and the gradient endpoint colors are evaluated at the
//! data's extremes against the chosen display range.

use chrono::{DateTime, FixedOffset, Timelike};
use tracing::debug;

use glance_proto::ForecastScene;

use crate::color::{self, ColorInput};

/// Substituted for missing or unparsable temperature entries.
pub const PLACEHOLDER_TEMP: i16 = 20;

/// Gradient range fallback when neither the caller nor the data supply one.
pub const DEFAULT_GRADIENT_MIN: i32 = 0;
pub const DEFAULT_GRADIENT_MAX: i32 = 30;

/// Thermometer icon + current-value placeholder + "°C".
pub const DEFAULT_TEMPLATE: [u8; 6] = [194, 143, 8, 194, 176, 67];

const SLOT_COUNT: usize = 24;
const TAIL_COUNT: usize = 23;

/// One entry of the caller's hourly series. `temperature: None` marks an
/// entry the source could not supply a reading for.
#[derive(Debug, Clone)]
pub struct HourlyReading {
    pub time: DateTime<FixedOffset>,
    pub temperature: Option<f64>,
}

/// Caller knobs for the gradient and display template.
#[derive(Debug, Clone, Default)]
pub struct ForecastOptions {
    pub max_color: Option<ColorInput>,
    pub min_color: Option<ColorInput>,
    /// User-specified gradient bounds; both must be set to take effect.
    pub min_value: Option<i32>,
    pub max_value: Option<i32>,
    pub template: Option<Vec<u8>>,
}

/// Intermediate result, kept separate from the wire scene so the range
/// arithmetic stays inspectable.
#[derive(Debug, PartialEq)]
struct ForecastPlan {
    temps: [i16; SLOT_COUNT],
    actual_min: i16,
    actual_max: i16,
    forecast_min: Option<i16>,
    forecast_max: Option<i16>,
    gradient_min: i32,
    gradient_max: i32,
}

/// Build the forecast scene for `now` from the caller's series.
///
/// Never fails on input shape: empty series, missing temperatures and short
/// tails all degrade to placeholder/padded slots.
pub fn build_forecast(
    now: DateTime<FixedOffset>,
    readings: &[HourlyReading],
    current_temp: Option<f64>,
    opts: &ForecastOptions,
) -> ForecastScene {
    let plan = plan_forecast(now, readings, current_temp, opts);

    let max_color = color::parse_color(opts.max_color.as_ref(), 0xff0000);
    let min_color = color::parse_color(opts.min_color.as_ref(), 0x0000ff);

    // Endpoint colors are evaluated at the data extremes against the display
    // range; a narrower user range saturates at the ends.
    let gradient_min_color = color::interpolate_color(
        plan.actual_min as f64,
        plan.gradient_min as f64,
        plan.gradient_max as f64,
        min_color,
        max_color,
    );
    let gradient_max_color = color::interpolate_color(
        plan.actual_max as f64,
        plan.gradient_min as f64,
        plan.gradient_max as f64,
        min_color,
        max_color,
    );

    let mut values = Vec::with_capacity(SLOT_COUNT * 2);
    for t in plan.temps {
        values.extend_from_slice(&t.to_le_bytes());
    }

    debug!(
        actual_min = plan.actual_min,
        actual_max = plan.actual_max,
        gradient_min = plan.gradient_min,
        gradient_max = plan.gradient_max,
        "forecast processed"
    );

    ForecastScene {
        timestamp: local_adjusted_epoch(now),
        max: plan.forecast_max.unwrap_or(DEFAULT_GRADIENT_MAX as i16) as i32,
        min: plan.forecast_min.unwrap_or(DEFAULT_GRADIENT_MIN as i16) as i32,
        max_color: gradient_max_color,
        min_color: gradient_min_color,
        values,
        template: opts
            .template
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_vec()),
    }
}

fn plan_forecast(
    now: DateTime<FixedOffset>,
    readings: &[HourlyReading],
    current_temp: Option<f64>,
    opts: &ForecastOptions,
) -> ForecastPlan {
    let current_hour = truncate_to_hour(now);

    // First entry at or after the current hour; earliest data if none align.
    let start = readings
        .iter()
        .position(|r| truncate_to_hour(r.time) >= current_hour)
        .unwrap_or(0);

    let mut tail: Vec<i16> = readings[start..]
        .iter()
        .take(TAIL_COUNT)
        .map(|r| r.temperature.map(|t| t as i16).unwrap_or(PLACEHOLDER_TEMP))
        .collect();
    // Short series: repeat the last known value out to the full tail.
    if let Some(&last) = tail.last() {
        while tail.len() < TAIL_COUNT {
            tail.push(last);
        }
    }

    let forecast_min = tail.iter().copied().min();
    let forecast_max = tail.iter().copied().max();

    let slot0 = current_temp
        .map(|t| t as i16)
        .or_else(|| tail.first().copied())
        .unwrap_or(PLACEHOLDER_TEMP);

    let mut temps = Vec::with_capacity(SLOT_COUNT);
    temps.push(slot0);
    temps.extend_from_slice(&tail);
    while temps.len() < SLOT_COUNT {
        temps.push(*temps.last().expect("slot 0 always present"));
    }
    temps.truncate(SLOT_COUNT);
    let temps: [i16; SLOT_COUNT] = temps.try_into().expect("exactly 24 slots");

    let actual_min = *temps.iter().min().expect("non-empty");
    let actual_max = *temps.iter().max().expect("non-empty");

    let (gradient_min, gradient_max) = match (opts.min_value, opts.max_value) {
        (Some(min), Some(max)) => (min, max),
        _ => (
            forecast_min.map(i32::from).unwrap_or(DEFAULT_GRADIENT_MIN),
            forecast_max.map(i32::from).unwrap_or(DEFAULT_GRADIENT_MAX),
        ),
    };

    ForecastPlan {
        temps,
        actual_min,
        actual_max,
        forecast_min,
        forecast_max,
        gradient_min,
        gradient_max,
    }
}

fn truncate_to_hour(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("zeroing sub-hour fields is always valid")
}

/// Epoch seconds shifted by the local UTC offset, so slot 0 lines up with
/// the device's wall clock.
fn local_adjusted_epoch(now: DateTime<FixedOffset>) -> u64 {
    let shifted = now.timestamp() + now.offset().local_minus_utc() as i64;
    shifted.max(0) as u64
}
