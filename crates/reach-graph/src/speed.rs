//! Travel-time weight model.
//!
//! Driving speeds come from the `maxspeed` tag when it parses, otherwise
//! from a conservative highway-class table (favoring smaller values so
//! travel times are never underestimated).  Walking is a flat 5 km/h.

const MPH_TO_KMH: f64 = 1.609_34;

/// Walking speed in metres per second (5 km/h).
pub const WALK_MPS: f64 = 5_000.0 / 3_600.0;

/// Default driving speed in km/h for a highway class.
///
/// Matching is by substring so link roads inherit their parent class
/// (`motorway_link` → motorway).  Unknown classes get 40 km/h.
pub fn default_drive_kmh(highway: &str) -> f64 {
    let h = highway.to_ascii_lowercase();
    if h.contains("motorway") {
        100.0
    } else if h.contains("trunk") {
        80.0
    } else if h.contains("primary") {
        65.0
    } else if h.contains("secondary") {
        55.0
    } else if h.contains("tertiary") {
        45.0
    } else if h.contains("residential") || h.contains("living_street") {
        25.0
    } else if h.contains("service") || h.contains("unclassified") {
        15.0
    } else {
        40.0
    }
}

/// Parse an OSM `maxspeed` value to km/h.
///
/// Handles `"50"`, `"50 km/h"`, `"35 mph"`, `"30;45"`, `"20, 30 mph"`.
/// Semicolon/comma lists take the minimum (conservative).  Values with
/// `mph` anywhere are converted.  Tokens like `signals`, `variable`, or
/// `none` yield `None`, as does an explicit zero.
pub fn parse_maxspeed_kmh(raw: &str) -> Option<f64> {
    let s = raw.to_ascii_lowercase();
    let is_mph = s.contains("mph");

    let mut min_kmh: Option<f64> = None;
    let mut token = String::new();
    for c in s.chars().chain(std::iter::once(';')) {
        if c.is_ascii_digit() || c == '.' {
            token.push(c);
        } else if !token.is_empty() {
            if let Ok(v) = token.parse::<f64>() {
                if v > 0.0 {
                    let kmh = if is_mph { v * MPH_TO_KMH } else { v };
                    min_kmh = Some(min_kmh.map_or(kmh, |m: f64| m.min(kmh)));
                }
            }
            token.clear();
        }
    }
    min_kmh
}

/// Effective driving speed in m/s for a way: `maxspeed` if it parses,
/// otherwise the highway-class default.  Clamped to at least 1 km/h.
pub fn drive_mps(maxspeed: Option<&str>, highway: &str) -> f64 {
    let kmh = maxspeed
        .and_then(parse_maxspeed_kmh)
        .unwrap_or_else(|| default_drive_kmh(highway));
    kmh.max(1.0) * (1_000.0 / 3_600.0)
}

/// Travel time in whole seconds for a segment, clamped to `[1, 65_534]`.
///
/// The lower clamp keeps zero-weight edges out of the graph (the search
/// kernel treats them as corruption).
pub fn segment_seconds(length_m: f64, speed_mps: f64) -> u16 {
    let secs = (length_m / speed_mps.max(0.1)).ceil();
    if !secs.is_finite() {
        return 65_534;
    }
    (secs as u64).clamp(1, 65_534) as u16
}
