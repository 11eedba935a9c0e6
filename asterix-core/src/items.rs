//! Per-item binary decoders and the decoder registry.
//!
//! Each decoder is a pure function of (buffer, cursor) returning the decoded
//! value and the number of bytes it consumed. Decoded values are JSON
//! objects with stable snake_case keys (`sac`, `range_nm`, `icao24`, ...) —
//! the contract the enrichment layer consumes. Items whose sub-field layout
//! this library does not interpret fall back to [`decode_raw_chained`],
//! which preserves the octets as hex, byte-exactly.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::bytes::{
    hex_lower, read_chained, read_i16, read_u16, read_u24, read_u8, sign_extend,
};
use crate::config::DecodeSettings;
use crate::types::ShortRead;

/// Decode outcome: the value and the bytes consumed.
pub type ItemResult = std::result::Result<(Value, usize), ShortRead>;

/// A registered item decoder.
pub type DecodeFn = Arc<dyn Fn(&[u8], usize) -> ItemResult + Send + Sync>;

// ---------------------------------------------------------------------------
// Scaling constants
// ---------------------------------------------------------------------------

/// Range LSB: 1/256 nautical mile.
pub const RANGE_LSB_NM: f64 = 1.0 / 256.0;
/// Angle LSB: 360/2^16 degrees.
pub const ANGLE_LSB_DEG: f64 = 360.0 / 65536.0;
/// Velocity LSB: 1/2^14 NM/s. Edition-dependent; override via
/// [`DecodeSettings`] when a feed documents a different one.
pub const DEFAULT_VELOCITY_LSB_NM_S: f64 = 1.0 / 16384.0;
/// Time-of-day LSB: 1/128 second.
pub const TOD_LSB_S: f64 = 1.0 / 128.0;
/// 24-bit latitude/longitude LSB: 180/2^23 degrees.
pub const LATLON_LSB_DEG: f64 = 180.0 / 8_388_608.0;

const MPS_PER_NM_S: f64 = 1852.0;
const KTS_PER_NM_S: f64 = 3600.0;

// ---------------------------------------------------------------------------
// Semantic decoders
// ---------------------------------------------------------------------------

/// Data Source Identifier: (SAC, SIC), one byte each.
pub fn decode_data_source(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u16(buf, at)?;
    Ok((json!({"sac": raw >> 8, "sic": raw & 0xFF}), 2))
}

/// Target Report Descriptor: chained octets; the first carries a 3-bit
/// detection type and four flags.
pub fn decode_target_report(buf: &[u8], at: usize) -> ItemResult {
    let (octets, end) = read_chained(buf, at)?;
    let first = octets[0];
    Ok((
        json!({
            "detection_type": first >> 5,
            "simulated": first & 0x10 != 0,
            "reported_as_bad": first & 0x08 != 0,
            "test_target": first & 0x04 != 0,
            "meaconing": first & 0x02 != 0,
            "raw": hex_lower(octets),
        }),
        end - at,
    ))
}

/// Measured position in slant polar coordinates: RHO then THETA.
pub fn decode_position_polar(buf: &[u8], at: usize) -> ItemResult {
    let rho = read_u16(buf, at)?;
    let theta = read_u16(buf, at + 2)?;
    Ok((
        json!({
            "range_nm": rho as f64 * RANGE_LSB_NM,
            "bearing_deg": theta as f64 * ANGLE_LSB_DEG,
        }),
        4,
    ))
}

/// Mode-3/A code: four 3-bit octal digits, MSB first.
pub fn decode_mode3a(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u16(buf, at)?;
    let code = format!(
        "{}{}{}{}",
        (raw >> 9) & 0x7,
        (raw >> 6) & 0x7,
        (raw >> 3) & 0x7,
        raw & 0x7
    );
    Ok((json!({"code": code}), 2))
}

/// Flight level in quarter-FL units, signed.
pub fn decode_flight_level(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_i16(buf, at)?;
    Ok((json!({"flight_level": raw as f64 / 4.0}), 2))
}

/// Calculated track velocity, polar: groundspeed then heading.
pub fn decode_velocity_polar(buf: &[u8], at: usize) -> ItemResult {
    decode_velocity_polar_with(buf, at, DEFAULT_VELOCITY_LSB_NM_S)
}

/// [`decode_velocity_polar`] with an explicit speed LSB (NM/s per unit).
pub fn decode_velocity_polar_with(buf: &[u8], at: usize, lsb_nm_s: f64) -> ItemResult {
    let speed = read_u16(buf, at)?;
    let heading = read_u16(buf, at + 2)?;
    let nm_s = speed as f64 * lsb_nm_s;
    Ok((
        json!({
            "speed_mps": nm_s * MPS_PER_NM_S,
            "speed_kts": nm_s * KTS_PER_NM_S,
            "heading_deg": heading as f64 * ANGLE_LSB_DEG,
        }),
        4,
    ))
}

/// Aircraft address (Mode S), uppercase hex.
pub fn decode_aircraft_address(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u24(buf, at)?;
    Ok((json!({"icao24": format!("{raw:06X}")}), 3))
}

/// Track number, unsigned.
pub fn decode_track_number(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u16(buf, at)?;
    Ok((json!({"track_number": raw}), 2))
}

/// Calculated position in Cartesian coordinates, signed axes.
pub fn decode_position_cartesian(buf: &[u8], at: usize) -> ItemResult {
    let x = read_i16(buf, at)?;
    let y = read_i16(buf, at + 2)?;
    Ok((
        json!({
            "x_nm": x as f64 * RANGE_LSB_NM,
            "y_nm": y as f64 * RANGE_LSB_NM,
        }),
        4,
    ))
}

/// Calculated track velocity in Cartesian coordinates, signed axes.
///
/// Not bound in the built-in CAT048 profile (no position carries it there);
/// register it for feeds that do.
pub fn decode_velocity_cartesian(buf: &[u8], at: usize) -> ItemResult {
    decode_velocity_cartesian_with(buf, at, DEFAULT_VELOCITY_LSB_NM_S)
}

/// [`decode_velocity_cartesian`] with an explicit per-axis LSB (NM/s).
pub fn decode_velocity_cartesian_with(buf: &[u8], at: usize, lsb_nm_s: f64) -> ItemResult {
    let vx = read_i16(buf, at)?;
    let vy = read_i16(buf, at + 2)?;
    let vx_nm_s = vx as f64 * lsb_nm_s;
    let vy_nm_s = vy as f64 * lsb_nm_s;
    Ok((
        json!({
            "vx_mps": vx_nm_s * MPS_PER_NM_S,
            "vy_mps": vy_nm_s * MPS_PER_NM_S,
            "vx_kts": vx_nm_s * KTS_PER_NM_S,
            "vy_kts": vy_nm_s * KTS_PER_NM_S,
        }),
        4,
    ))
}

/// Time of day in 1/128 s since midnight.
pub fn decode_time_of_day(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u24(buf, at)?;
    Ok((json!({"seconds": raw as f64 * TOD_LSB_S}), 3))
}

/// Service message types (status category).
const MESSAGE_TYPES: &[(u8, &str)] = &[
    (1, "North Marker message"),
    (2, "Sector crossing message"),
    (3, "Geographical filtering message"),
    (4, "Jamming Strobe message"),
    (5, "Solar Storm message"),
    (6, "SSR Jamming Strobe message"),
    (7, "Mode S Jamming Strobe message"),
];

/// Message type, one byte, labeled from [`MESSAGE_TYPES`].
pub fn decode_message_type(buf: &[u8], at: usize) -> ItemResult {
    let code = read_u8(buf, at)?;
    let label = MESSAGE_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, l)| *l)
        .unwrap_or("Unknown");
    Ok((json!({"message_type": code, "label": label}), 1))
}

/// Antenna sector number in 360/256-degree units.
pub fn decode_sector_number(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u8(buf, at)?;
    Ok((json!({"sector_deg": raw as f64 * (360.0 / 256.0)}), 1))
}

/// Antenna rotation period in 1/128 s; rpm derived when the period is
/// non-zero.
pub fn decode_antenna_rotation(buf: &[u8], at: usize) -> ItemResult {
    let raw = read_u16(buf, at)?;
    let period_s = raw as f64 * TOD_LSB_S;
    let value = if period_s > 0.0 {
        json!({"period_s": period_s, "rpm": 60.0 / period_s})
    } else {
        json!({"period_s": period_s})
    };
    Ok((value, 2))
}

/// Generic polar window: two ranges and two bearings.
pub fn decode_polar_window(buf: &[u8], at: usize) -> ItemResult {
    let rho_start = read_u16(buf, at)?;
    let rho_end = read_u16(buf, at + 2)?;
    let theta_start = read_u16(buf, at + 4)?;
    let theta_end = read_u16(buf, at + 6)?;
    Ok((
        json!({
            "range_start_nm": rho_start as f64 * RANGE_LSB_NM,
            "range_end_nm": rho_end as f64 * RANGE_LSB_NM,
            "bearing_start_deg": theta_start as f64 * ANGLE_LSB_DEG,
            "bearing_end_deg": theta_end as f64 * ANGLE_LSB_DEG,
        }),
        8,
    ))
}

const DATA_FILTER_TYPES: &[(u8, &str)] = &[
    (0, "Invalid value"),
    (1, "Filter for Weather data"),
    (2, "Filter for Jamming Strobe"),
    (3, "Filter for PSR data"),
    (4, "Filter for SSR/Mode S data"),
    (5, "Filter for SSR/Mode S + PSR data"),
    (6, "Enhanced Surveillance mode data"),
    (7, "Filter for PSR + Enhanced Surveillance data"),
    (8, "Filter for PSR + Enhanced Surveillance + SSR/Mode S data not in Area of Prime Interest"),
    (9, "Filter for PSR + Enhanced Surveillance + all SSR/Mode S data"),
];

/// Data filter, one byte, labeled from [`DATA_FILTER_TYPES`].
pub fn decode_data_filter(buf: &[u8], at: usize) -> ItemResult {
    let code = read_u8(buf, at)?;
    let label = DATA_FILTER_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, l)| *l)
        .unwrap_or("Unknown/Reserved");
    Ok((json!({"filter": code, "label": label}), 1))
}

/// 3D sensor position: signed 16-bit height in meters, then 24-bit signed
/// latitude and longitude.
pub fn decode_sensor_position(buf: &[u8], at: usize) -> ItemResult {
    let height = read_i16(buf, at)?;
    let lat_raw = read_u24(buf, at + 2)?;
    let lon_raw = read_u24(buf, at + 5)?;
    Ok((
        json!({
            "height_m": height,
            "lat_deg": sign_extend(lat_raw, 24) as f64 * LATLON_LSB_DEG,
            "lon_deg": sign_extend(lon_raw, 24) as f64 * LATLON_LSB_DEG,
        }),
        8,
    ))
}

/// Collimation error: byte-wise signed range and azimuth corrections.
pub fn decode_collimation_error(buf: &[u8], at: usize) -> ItemResult {
    let range_err = read_u8(buf, at)? as i8;
    let azimuth_err = read_u8(buf, at + 1)? as i8;
    Ok((
        json!({
            "range_error_nm": range_err as f64 / 128.0,
            "azimuth_error_deg": azimuth_err as f64 * (360.0 / 16384.0),
        }),
        2,
    ))
}

/// Fallback for items whose sub-field layout is not interpreted here: keep
/// the chained octets as hex. Re-rendering the hex reproduces the wire bytes
/// exactly.
pub fn decode_raw_chained(buf: &[u8], at: usize) -> ItemResult {
    let (octets, end) = read_chained(buf, at)?;
    Ok((json!({"raw": hex_lower(octets)}), end - at))
}

// ---------------------------------------------------------------------------
// Decoder registry
// ---------------------------------------------------------------------------

/// Registry of (category, item identifier) → decoder.
///
/// Same contract as the UAP registry: populate before decoding, share
/// freely afterwards.
#[derive(Clone, Default)]
pub struct DecoderTable {
    map: HashMap<(u8, String), DecodeFn>,
}

impl DecoderTable {
    /// An empty registry.
    pub fn new() -> Self {
        DecoderTable {
            map: HashMap::new(),
        }
    }

    /// Register (or replace) the decoder for one item.
    pub fn register<F>(&mut self, category: u8, item: &str, decoder: F)
    where
        F: Fn(&[u8], usize) -> ItemResult + Send + Sync + 'static,
    {
        self.map
            .insert((category, item.to_string()), Arc::new(decoder));
    }

    /// The decoder for one item, or `None` if not registered.
    pub fn lookup(&self, category: u8, item: &str) -> Option<&DecodeFn> {
        self.map.get(&(category, item.to_string()))
    }

    /// The built-in registry covering every CAT034/CAT048 profile entry:
    /// semantic decoders where this library interprets the layout, the
    /// raw-chained fallback everywhere else.
    pub fn standard(settings: &DecodeSettings) -> Self {
        let mut table = DecoderTable::new();
        let velocity_lsb = settings.velocity_lsb_nm_s;

        table.register(48, "I048/010", decode_data_source);
        table.register(48, "I048/020", decode_target_report);
        table.register(48, "I048/040", decode_position_polar);
        table.register(48, "I048/070", decode_mode3a);
        table.register(48, "I048/090", decode_flight_level);
        table.register(48, "I048/140", decode_time_of_day);
        table.register(48, "I048/161", decode_track_number);
        table.register(48, "I048/042", decode_position_cartesian);
        table.register(48, "I048/200", move |buf, at| {
            decode_velocity_polar_with(buf, at, velocity_lsb)
        });
        table.register(48, "I048/220", decode_aircraft_address);

        table.register(34, "I034/010", decode_data_source);
        table.register(34, "I034/000", decode_message_type);
        table.register(34, "I034/030", decode_time_of_day);
        table.register(34, "I034/020", decode_sector_number);
        table.register(34, "I034/041", decode_antenna_rotation);
        table.register(34, "I034/100", decode_polar_window);
        table.register(34, "I034/110", decode_data_filter);
        table.register(34, "I034/120", decode_sensor_position);
        table.register(34, "I034/090", decode_collimation_error);

        for item in crate::uap::CAT048_UAP {
            if table.lookup(48, item).is_none() {
                table.register(48, item, decode_raw_chained);
            }
        }
        for item in crate::uap::CAT034_UAP {
            if table.lookup(34, item).is_none() {
                table.register(34, item, decode_raw_chained);
            }
        }

        table
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uap::{CAT034_UAP, CAT048_UAP};

    #[test]
    fn test_data_source() {
        let (v, n) = decode_data_source(&[0x12, 0x34], 0).unwrap();
        assert_eq!(n, 2);
        assert_eq!(v["sac"], 0x12);
        assert_eq!(v["sic"], 0x34);
    }

    #[test]
    fn test_target_report_single_octet() {
        let (v, n) = decode_target_report(&[0x38], 0).unwrap();
        assert_eq!(n, 1);
        assert_eq!(v["detection_type"], 1);
        assert_eq!(v["simulated"], true);
        assert_eq!(v["reported_as_bad"], true);
        assert_eq!(v["test_target"], false);
        assert_eq!(v["meaconing"], false);
        assert_eq!(v["raw"], "38");
    }

    #[test]
    fn test_target_report_chained() {
        // FX set in the first octet; the extension is kept raw.
        let (v, n) = decode_target_report(&[0x39, 0x20], 0).unwrap();
        assert_eq!(n, 2);
        assert_eq!(v["detection_type"], 1);
        assert_eq!(v["raw"], "3920");
    }

    #[test]
    fn test_position_polar() {
        // RHO=2560 (10 NM), THETA=16384 (90 degrees)
        let (v, n) = decode_position_polar(&[0x0A, 0x00, 0x40, 0x00], 0).unwrap();
        assert_eq!(n, 4);
        assert_eq!(v["range_nm"], 10.0);
        assert_eq!(v["bearing_deg"], 90.0);
    }

    #[test]
    fn test_position_polar_truncated() {
        let err = decode_position_polar(&[0x0A, 0x00, 0x40], 0).unwrap_err();
        assert_eq!(
            err,
            ShortRead {
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_mode3a() {
        // 0754 → A=0 B=7 C=5 D=4 → 0b0_000_111_101_100
        let (v, _) = decode_mode3a(&[0x01, 0xEC], 0).unwrap();
        assert_eq!(v["code"], "0754");
        // High (validity) bits do not disturb the digits.
        let (v, _) = decode_mode3a(&[0x81, 0xEC], 0).unwrap();
        assert_eq!(v["code"], "0754");
        let (v, _) = decode_mode3a(&[0x0F, 0xFF], 0).unwrap();
        assert_eq!(v["code"], "7777");
    }

    #[test]
    fn test_flight_level() {
        let (v, _) = decode_flight_level(&[0x01, 0x90], 0).unwrap();
        assert_eq!(v["flight_level"], 100.0);
        let (v, _) = decode_flight_level(&[0xFF, 0xFC], 0).unwrap();
        assert_eq!(v["flight_level"], -1.0);
    }

    #[test]
    fn test_velocity_polar() {
        // speed raw 16384 = 1 NM/s; heading raw 8192 = 45 degrees
        let (v, n) = decode_velocity_polar(&[0x40, 0x00, 0x20, 0x00], 0).unwrap();
        assert_eq!(n, 4);
        assert_eq!(v["speed_mps"], 1852.0);
        assert_eq!(v["speed_kts"], 3600.0);
        assert_eq!(v["heading_deg"], 45.0);
    }

    #[test]
    fn test_velocity_polar_custom_lsb() {
        let (v, _) =
            decode_velocity_polar_with(&[0x40, 0x00, 0x00, 0x00], 0, 1.0 / 8192.0).unwrap();
        assert_eq!(v["speed_kts"], 7200.0);
    }

    #[test]
    fn test_aircraft_address() {
        let (v, n) = decode_aircraft_address(&[0xAA, 0xBB, 0xCC], 0).unwrap();
        assert_eq!(n, 3);
        assert_eq!(v["icao24"], "AABBCC");
        let (v, _) = decode_aircraft_address(&[0x00, 0x0A, 0x0B], 0).unwrap();
        assert_eq!(v["icao24"], "000A0B");
    }

    #[test]
    fn test_track_number() {
        let (v, _) = decode_track_number(&[0x04, 0xD2], 0).unwrap();
        assert_eq!(v["track_number"], 1234);
    }

    #[test]
    fn test_position_cartesian() {
        let (v, _) = decode_position_cartesian(&[0xFF, 0x00, 0x01, 0x00], 0).unwrap();
        assert_eq!(v["x_nm"], -1.0);
        assert_eq!(v["y_nm"], 1.0);
    }

    #[test]
    fn test_velocity_cartesian() {
        let (v, _) = decode_velocity_cartesian(&[0x40, 0x00, 0xC0, 0x00], 0).unwrap();
        assert_eq!(v["vx_mps"], 1852.0);
        assert_eq!(v["vy_mps"], -1852.0);
        assert_eq!(v["vx_kts"], 3600.0);
        assert_eq!(v["vy_kts"], -3600.0);
    }

    #[test]
    fn test_time_of_day() {
        let (v, n) = decode_time_of_day(&[0x01, 0x00, 0x00], 0).unwrap();
        assert_eq!(n, 3);
        assert_eq!(v["seconds"], 512.0);
    }

    #[test]
    fn test_message_type() {
        let (v, _) = decode_message_type(&[0x01], 0).unwrap();
        assert_eq!(v["label"], "North Marker message");
        let (v, _) = decode_message_type(&[0x63], 0).unwrap();
        assert_eq!(v["label"], "Unknown");
    }

    #[test]
    fn test_sector_number() {
        let (v, _) = decode_sector_number(&[0x40], 0).unwrap();
        assert_eq!(v["sector_deg"], 90.0);
    }

    #[test]
    fn test_antenna_rotation() {
        // 512/128 = 4 s per revolution → 15 rpm
        let (v, _) = decode_antenna_rotation(&[0x02, 0x00], 0).unwrap();
        assert_eq!(v["period_s"], 4.0);
        assert_eq!(v["rpm"], 15.0);
        // Zero period: rpm undefined, key absent
        let (v, _) = decode_antenna_rotation(&[0x00, 0x00], 0).unwrap();
        assert_eq!(v["period_s"], 0.0);
        assert!(v.get("rpm").is_none());
    }

    #[test]
    fn test_polar_window() {
        let (v, n) =
            decode_polar_window(&[0x00, 0x80, 0x01, 0x00, 0x20, 0x00, 0x40, 0x00], 0).unwrap();
        assert_eq!(n, 8);
        assert_eq!(v["range_start_nm"], 0.5);
        assert_eq!(v["range_end_nm"], 1.0);
        assert_eq!(v["bearing_start_deg"], 45.0);
        assert_eq!(v["bearing_end_deg"], 90.0);
    }

    #[test]
    fn test_data_filter() {
        let (v, _) = decode_data_filter(&[0x01], 0).unwrap();
        assert_eq!(v["label"], "Filter for Weather data");
        let (v, _) = decode_data_filter(&[0x7F], 0).unwrap();
        assert_eq!(v["label"], "Unknown/Reserved");
    }

    #[test]
    fn test_sensor_position() {
        // height -100 m, lat +45, lon -90
        let buf = [0xFF, 0x9C, 0x20, 0x00, 0x00, 0xC0, 0x00, 0x00];
        let (v, n) = decode_sensor_position(&buf, 0).unwrap();
        assert_eq!(n, 8);
        assert_eq!(v["height_m"], -100);
        assert_eq!(v["lat_deg"], 45.0);
        assert_eq!(v["lon_deg"], -90.0);
    }

    #[test]
    fn test_collimation_error() {
        let (v, _) = decode_collimation_error(&[0xFF, 0x40], 0).unwrap();
        assert_eq!(v["range_error_nm"], -1.0 / 128.0);
        assert_eq!(v["azimuth_error_deg"], 64.0 * 360.0 / 16384.0);
    }

    #[test]
    fn test_raw_chained_roundtrip() {
        let buf = [0x0D, 0x0A, 0xFF];
        let (v, n) = decode_raw_chained(&buf, 0).unwrap();
        assert_eq!(n, 2);
        assert_eq!(v["raw"], "0d0a");
        // Re-rendering the hex reproduces the consumed bytes exactly.
        let hex = v["raw"].as_str().unwrap();
        let bytes: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();
        assert_eq!(bytes, &buf[..n]);
    }

    #[test]
    fn test_standard_table_covers_profiles() {
        let table = DecoderTable::standard(&DecodeSettings::default());
        for item in CAT048_UAP {
            assert!(table.lookup(48, item).is_some(), "no decoder for {item}");
        }
        for item in CAT034_UAP {
            assert!(table.lookup(34, item).is_some(), "no decoder for {item}");
        }
        assert!(table.lookup(62, "I062/185").is_none());
    }

    #[test]
    fn test_standard_table_velocity_override() {
        let settings = DecodeSettings {
            velocity_lsb_nm_s: 1.0 / 8192.0,
        };
        let table = DecoderTable::standard(&settings);
        let decoder = table.lookup(48, "I048/200").unwrap();
        let (v, _) = decoder(&[0x40, 0x00, 0x00, 0x00], 0).unwrap();
        assert_eq!(v["speed_kts"], 7200.0);
    }

    #[test]
    fn test_register_custom_decoder() {
        let mut table = DecoderTable::standard(&DecodeSettings::default());
        table.register(62, "I062/185", decode_velocity_cartesian);
        let decoder = table.lookup(62, "I062/185").unwrap();
        let (v, _) = decoder(&[0x40, 0x00, 0x40, 0x00], 0).unwrap();
        assert_eq!(v["vx_kts"], 3600.0);
    }
}
