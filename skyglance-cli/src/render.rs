use chrono::{DateTime, Local, TimeZone};
use skyglance_core::{Snapshot, Unit, WeatherRecord};
use std::fmt::Display;

/// Rounded temperature with its unit symbol, e.g. `15°C`.
pub fn format_temperature(value: f64, unit: Unit) -> String {
    format!("{}{}", value.round() as i64, unit.temperature_symbol())
}

pub fn render_dashboard(snapshot: &Snapshot) -> String {
    let width = snapshot
        .tiles
        .iter()
        .map(|t| t.city.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!("Dashboard ({})", snapshot.unit)];
    lines.extend(snapshot.tiles.iter().map(|tile| {
        let marker = if tile.is_current { "@" } else { "-" };
        let temperature = tile
            .record
            .as_ref()
            .map(|r| format_temperature(r.temperature, r.unit))
            .unwrap_or_default();

        format!("{marker} {:<width$}  {temperature}", tile.city)
    }));

    lines.join("\n").trim_end().to_string()
}

pub fn render_detail(record: &WeatherRecord) -> String {
    render_detail_in(record, &Local)
}

/// Detail view with sunrise/sunset shown in `tz`.
pub fn render_detail_in<Tz>(record: &WeatherRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let unit = record.unit;
    let optional_temp = |v: Option<f64>| {
        v.map(|t| format_temperature(t, unit))
            .unwrap_or_else(|| "n/a".to_string())
    };
    let clock = |ts: Option<i64>| {
        ts.and_then(|ts| format_clock(ts, tz))
            .unwrap_or_else(|| "n/a".to_string())
    };

    let wind = record
        .wind_speed
        .map(|w| format!("{w} {}", unit.speed_symbol()))
        .unwrap_or_else(|| "n/a".to_string());
    let humidity = record
        .humidity_pct
        .map(|h| format!("{h}%"))
        .unwrap_or_else(|| "n/a".to_string());

    [
        record.name.clone(),
        record.description.clone(),
        format_temperature(record.temperature, unit),
        format!(
            "H: {}  L: {}",
            optional_temp(record.temp_max),
            optional_temp(record.temp_min)
        ),
        format!(
            "Sunrise: {}  Sunset: {}",
            clock(record.sunrise),
            clock(record.sunset)
        ),
        format!("Wind: {wind}  Humidity: {humidity}"),
    ]
    .join("\n")
}

fn format_clock<Tz>(epoch_secs: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::from_timestamp(epoch_secs, 0)?;
    Some(utc.with_timezone(tz).format("%H:%M:%S").to_string())
}
