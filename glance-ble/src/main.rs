//! Command-line control tool for Glance Clock devices
//!
//! Scans for clocks and sends notices, timers, forecasts and settings over BLE.

use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, Peripheral as _};
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use glance_link::{
    BleTransport, ColorInput, ForecastOptions, GlanceClient, HourlyReading, LinkManager,
    NoticeOptions, SettingsPatch, TimerIntervalSpec, build_forecast,
};

// Display names accepted on the command line, mapped to the device's numeric
// encodings.
const ANIMATIONS: &[(&str, u32)] = &[
    ("none", 0),
    ("pulse", 1),
    ("wave", 2),
    ("fire", 10),
    ("wheel", 11),
    ("flower", 12),
    ("flower2", 13),
    ("fan", 14),
    ("sun", 15),
    ("thunderstorm", 16),
    ("cloud", 17),
    ("weather_clear", 101),
    ("weather_cloudy", 102),
    ("weather_fog", 103),
    ("weather_light_rain", 104),
    ("weather_rain", 105),
    ("weather_thunderstorm", 106),
    ("weather_snow", 107),
    ("weather_hail", 108),
    ("weather_wind", 109),
    ("weather_tornado", 110),
    ("weather_hurricane", 111),
    ("weather_snow_thunderstorm", 112),
];

const SOUNDS: &[(&str, u32)] = &[
    ("none", 0),
    ("waves", 1),
    ("rise", 2),
    ("charging", 3),
    ("steps", 4),
    ("radar", 5),
    ("bells", 6),
    ("bye", 7),
    ("hello", 8),
    ("flowers", 9),
    ("circles", 10),
    ("complete", 11),
    ("popcorn", 12),
    ("break", 13),
    ("opening", 14),
    ("high", 15),
    ("shine", 16),
    ("extension", 17),
];

const COLORS: &[(&str, u32)] = &[
    ("black", 0),
    ("dark_golden_rod", 1),
    ("dark_orange", 2),
    ("olive", 3),
    ("orange_red", 4),
    ("red", 5),
    ("maroon", 6),
    ("dark_magenta", 7),
    ("medium_violet_red", 8),
    ("brown", 9),
    ("indigo", 10),
    ("blue_violet", 11),
    ("white", 12),
    ("light_slate_blue", 13),
    ("royal_blue", 14),
    ("blue", 15),
    ("cornflower_blue", 16),
    ("sky_blue", 17),
    ("turquoise", 18),
    ("aqua", 19),
    ("medium_spring_green", 20),
    ("lime_green", 21),
    ("dark_green", 22),
    ("lime", 23),
    ("lawn_green", 24),
];

const PRIORITIES: &[(&str, u32)] = &[
    ("low", 1),
    ("medium", 16),
    ("high", 48),
    ("highest", 64),
    ("critical", 80),
];

const TEXT_MODIFIERS: &[(&str, u32)] = &[
    ("none", 0),
    ("repeat", 1),
    ("rapid", 2),
    ("delay", 3),
];

#[derive(Parser)]
#[command(name = "glance-ble")]
#[command(about = "Command-line control tool for Glance Clock devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for Glance Clock devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Show a notice on the clock
    Notice {
        /// Device address (e.g. AA:BB:CC:DD:EE:FF)
        #[arg(short, long)]
        device: String,
        /// Notice text; may embed [icon:N] markers
        text: String,
        #[arg(long, default_value = "pulse")]
        animation: String,
        #[arg(long, default_value = "none")]
        sound: String,
        #[arg(long, default_value = "white")]
        color: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "none")]
        modifier: String,
        /// Optional title, shown as "title: text"
        #[arg(long)]
        title: Option<String>,
    },
    /// Start a countdown timer
    Timer {
        #[arg(short, long)]
        device: String,
        /// Total countdown in seconds
        countdown: u32,
        /// Interval stage as text:duration:countdown, repeatable
        #[arg(long = "interval")]
        intervals: Vec<String>,
        /// Text shown when the timer finishes, repeatable
        #[arg(long = "final-text")]
        final_text: Vec<String>,
    },
    /// Upload an hourly temperature forecast from a JSON file
    Forecast {
        #[arg(short, long)]
        device: String,
        /// JSON file: [{"time": "2026-08-29T14:00:00+02:00", "temperature": 21.5}, ...]
        file: String,
        /// Current temperature for the leading slot
        #[arg(long)]
        current: Option<f64>,
        /// Gradient color for the warm end, as RRGGBB hex
        #[arg(long)]
        max_color: Option<String>,
        /// Gradient color for the cold end, as RRGGBB hex
        #[arg(long)]
        min_color: Option<String>,
        /// Lower gradient bound; only used together with --max-value
        #[arg(long)]
        min_value: Option<i32>,
        /// Upper gradient bound; only used together with --min-value
        #[arg(long)]
        max_value: Option<i32>,
    },
    /// Read or change device settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Clock hand calibration
    Calibrate {
        #[command(subcommand)]
        action: CalibrateAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Get {
        #[arg(short, long)]
        device: String,
    },
    /// Change settings; unspecified fields keep their current value
    Set {
        #[arg(short, long)]
        device: String,
        #[arg(long)]
        night_mode: Option<bool>,
        #[arg(long)]
        points_always: Option<bool>,
        /// Display brightness, 0-255
        #[arg(long)]
        brightness: Option<u8>,
        #[arg(long)]
        time_mode: Option<bool>,
        /// true for 12-hour time, false for 24-hour
        #[arg(long)]
        time_format_12: Option<bool>,
        #[arg(long)]
        dnd: Option<bool>,
        #[arg(long)]
        mute: Option<bool>,
        #[arg(long)]
        date_format: Option<u8>,
        /// Seconds of inactivity before the display sleeps
        #[arg(long)]
        activity_timeout: Option<u32>,
    },
}

#[derive(Subcommand)]
enum CalibrateAction {
    /// Move the hands to the calibration position
    Start {
        #[arg(short, long)]
        device: String,
    },
    /// Confirm the hands are aligned at 12:00
    Confirm {
        #[arg(short, long)]
        device: String,
    },
}

#[derive(Deserialize)]
struct ForecastEntry {
    time: DateTime<FixedOffset>,
    temperature: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration } => {
            scan_devices(duration).await?;
        }
        Commands::Notice {
            device,
            text,
            animation,
            sound,
            color,
            priority,
            modifier,
            title,
        } => {
            let opts = NoticeOptions {
                animation: lookup(ANIMATIONS, "animation", &animation)?,
                sound: lookup(SOUNDS, "sound", &sound)?,
                color: lookup(COLORS, "color", &color)?,
                priority: lookup(PRIORITIES, "priority", &priority)? as u8,
                text_modifiers: lookup(TEXT_MODIFIERS, "modifier", &modifier)?,
            };
            let client = connect(&device).await?;
            match title {
                Some(title) => client.send_message(&title, &text, &opts).await?,
                None => client.send_notice(&text, &opts).await?,
            }
            println!("Notice sent.");
            client.link().stop().await;
        }
        Commands::Timer {
            device,
            countdown,
            intervals,
            final_text,
        } => {
            let intervals = intervals
                .iter()
                .map(|s| parse_interval(s))
                .collect::<Result<Vec<_>, _>>()?;
            let client = connect(&device).await?;
            client.send_timer(countdown, &intervals, &final_text).await?;
            println!("Timer started ({} seconds).", countdown);
            client.link().stop().await;
        }
        Commands::Forecast {
            device,
            file,
            current,
            max_color,
            min_color,
            min_value,
            max_value,
        } => {
            let content = std::fs::read_to_string(&file)?;
            let entries: Vec<ForecastEntry> = serde_json::from_str(&content)?;
            let readings: Vec<HourlyReading> = entries
                .into_iter()
                .map(|e| HourlyReading {
                    time: e.time,
                    temperature: e.temperature,
                })
                .collect();
            if readings.is_empty() && current.is_none() {
                return Err(glance_link::LinkError::NoForecastData.into());
            }

            let opts = ForecastOptions {
                max_color: max_color.map(ColorInput::Hex),
                min_color: min_color.map(ColorInput::Hex),
                min_value,
                max_value,
                template: None,
            };
            let now = Local::now().fixed_offset();
            let scene = build_forecast(now, &readings, current, &opts);
            println!(
                "Forecast range {}..{} over {} readings.",
                scene.min,
                scene.max,
                readings.len()
            );

            let client = connect(&device).await?;
            client.send_forecast(&scene).await?;
            println!("Forecast sent.");
            client.link().stop().await;
        }
        Commands::Settings { action } => match action {
            SettingsAction::Get { device } => {
                let client = connect(&device).await?;
                let settings = client.read_settings().await?;
                println!("Night mode:        {}", settings.night_mode_enabled);
                println!("Points always on:  {}", settings.points_always_enabled);
                println!("Brightness:        {}", settings.display_brightness);
                println!("Time mode:         {}", settings.time_mode_enabled);
                println!(
                    "Time format:       {}",
                    if settings.time_format_12 { "12h" } else { "24h" }
                );
                println!("Do not disturb:    {}", settings.permanent_dnd);
                println!("Mute:              {}", settings.permanent_mute);
                println!("Date format:       {}", settings.date_format);
                println!("Activity timeout:  {}s", settings.user_activity_timeout);
                client.link().stop().await;
            }
            SettingsAction::Set {
                device,
                night_mode,
                points_always,
                brightness,
                time_mode,
                time_format_12,
                dnd,
                mute,
                date_format,
                activity_timeout,
            } => {
                let patch = SettingsPatch {
                    night_mode_enabled: night_mode,
                    points_always_enabled: points_always,
                    display_brightness: brightness,
                    time_mode_enabled: time_mode,
                    time_format_12,
                    permanent_dnd: dnd,
                    permanent_mute: mute,
                    date_format,
                    user_activity_timeout: activity_timeout,
                };
                let client = connect(&device).await?;
                client.write_settings(&patch).await?;
                println!("Settings updated.");
                if patch.is_brightness_change() {
                    // Let the delayed preview-stop command go out before
                    // tearing the link down.
                    tokio::time::sleep(Duration::from_secs(4)).await;
                }
                client.link().stop().await;
            }
        },
        Commands::Calibrate { action } => match action {
            CalibrateAction::Start { device } => {
                let client = connect(&device).await?;
                client.calibrate_start().await?;
                println!("Calibration started. Align the hands to 12:00, then run `calibrate confirm`.");
                client.link().stop().await;
            }
            CalibrateAction::Confirm { device } => {
                let client = connect(&device).await?;
                client.calibrate_confirm().await?;
                println!("Calibration confirmed.");
                client.link().stop().await;
            }
        },
    }

    Ok(())
}

fn lookup(table: &[(&str, u32)], what: &str, name: &str) -> Result<u32, String> {
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            let known: Vec<&str> = table.iter().map(|(n, _)| *n).collect();
            format!("unknown {what} {name:?}; expected one of: {}", known.join(", "))
        })
}

/// Parse an interval spec of the form `text:duration:countdown`.
fn parse_interval(spec: &str) -> Result<TimerIntervalSpec, String> {
    let mut parts = spec.rsplitn(3, ':');
    let countdown = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| format!("bad interval {spec:?}: expected text:duration:countdown"))?;
    let duration = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| format!("bad interval {spec:?}: expected text:duration:countdown"))?;
    let text = parts
        .next()
        .ok_or_else(|| format!("bad interval {spec:?}: expected text:duration:countdown"))?
        .to_string();
    Ok(TimerIntervalSpec {
        text,
        duration,
        countdown,
    })
}

async fn scan_devices(duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for Glance Clock devices ({} seconds)...", duration);

    let transport = BleTransport::new().await?;
    tokio::time::sleep(Duration::from_secs(duration)).await;

    let peripherals = transport.adapter().peripherals().await?;

    println!("\nFound {} devices:", peripherals.len());
    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let addr = peripheral.address();
            let rssi = props
                .rssi
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string());

            let is_glance = name.starts_with("Glance");
            let marker = if is_glance { " [GLANCE]" } else { "" };

            println!("  {} ({}) RSSI: {}{}", name, addr, rssi, marker);
        }
    }

    transport.adapter().stop_scan().await?;
    Ok(())
}

async fn connect(address: &str) -> Result<GlanceClient<BleTransport>, Box<dyn std::error::Error>> {
    println!("Scanning for {}...", address);
    let transport = BleTransport::new().await?;
    // Give the advertisement a moment to land in the discovery cache.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let link = Arc::new(LinkManager::new(transport, address, address));
    println!("Connecting...");
    link.connect().await?;
    println!("Connected!");
    Ok(GlanceClient::new(link))
}
