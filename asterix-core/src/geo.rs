//! Geodetic enrichment — georeference polar plots from a radar site.
//!
//! A monoradar target report locates the target by slant range and bearing
//! from the antenna. Given the site position, project that onto the sphere
//! and attach the other per-target fields the record carries.

use serde::Serialize;

use crate::types::Record;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_NM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Project a (range, bearing) plot from a site into (lat, lon) degrees.
///
/// Spherical forward solution; bearing is clockwise from true north.
pub fn project_polar(site_lat: f64, site_lon: f64, range_nm: f64, bearing_deg: f64) -> (f64, f64) {
    let d = range_nm / EARTH_RADIUS_NM; // angular distance
    let brg = bearing_deg.to_radians();
    let lat1 = site_lat.to_radians();
    let lon1 = site_lon.to_radians();

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brg.cos()).asin();
    let lon2 = lon1
        + (brg.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    let mut lon_deg = lon2.to_degrees();
    if lon_deg > 180.0 {
        lon_deg -= 360.0;
    } else if lon_deg < -180.0 {
        lon_deg += 360.0;
    }
    (lat2.to_degrees(), lon_deg)
}

// ---------------------------------------------------------------------------
// Record enrichment
// ---------------------------------------------------------------------------

/// A georeferenced target plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotFix {
    pub lat: f64,
    pub lon: f64,
    pub range_nm: f64,
    pub bearing_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icao24: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tod_s: Option<f64>,
}

/// Georeference one decoded record against a radar site.
///
/// Returns `None` for records without a measured polar position (service
/// messages, unknown categories, partial decodes).
pub fn enrich(record: &Record, site_lat: f64, site_lon: f64) -> Option<PlotFix> {
    let range_nm = record.field_f64("I048/040", "range_nm")?;
    let bearing_deg = record.field_f64("I048/040", "bearing_deg")?;
    let (lat, lon) = project_polar(site_lat, site_lon, range_nm, bearing_deg);

    Some(PlotFix {
        lat,
        lon,
        range_nm,
        bearing_deg,
        flight_level: record.field_f64("I048/090", "flight_level"),
        speed_kts: record.field_f64("I048/200", "speed_kts"),
        heading_deg: record.field_f64("I048/200", "heading_deg"),
        icao24: record.field_str("I048/220", "icao24").map(str::to_string),
        track_number: record
            .field_u64("I048/161", "track_number")
            .map(|n| n as u16),
        tod_s: record.field_f64("I048/140", "seconds"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
