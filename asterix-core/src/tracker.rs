//! Per-target state with time-to-live memory.
//!
//! Pure logic — no I/O, no clock. Correlates decoded target reports into
//! tracks keyed by aircraft address (or sensor-local track number), emits
//! `TrackEvent` outputs for the caller to log or persist, and forgets tracks
//! that stay silent past the TTL. Time comes from the records' own
//! time-of-day items, so replaying a capture correlates identically every
//! run.

use std::collections::HashMap;
use std::fmt;

use crate::geo;
use crate::types::Record;

/// Tracks considered stale after this many seconds of silence.
pub const STALE_TTL_S: f64 = 60.0;

/// Maximum position history entries per track.
const MAX_HISTORY: usize = 120;

// ---------------------------------------------------------------------------
// Track identity
// ---------------------------------------------------------------------------

/// How a target report is correlated to a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// Mode S aircraft address — globally unique.
    Address(String),
    /// Sensor-local track number, qualified by the data source.
    SensorTrack { sac: u8, sic: u8, track: u16 },
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Address(a) => write!(f, "{a}"),
            TrackKey::SensorTrack { sac, sic, track } => write!(f, "{sac}/{sic}#{track}"),
        }
    }
}

fn track_key(record: &Record) -> Option<TrackKey> {
    if let Some(addr) = record.field_str("I048/220", "icao24") {
        return Some(TrackKey::Address(addr.to_string()));
    }
    let track = record.field_u64("I048/161", "track_number")? as u16;
    let sac = record.field_u64("I048/010", "sac").unwrap_or(0) as u8;
    let sic = record.field_u64("I048/010", "sic").unwrap_or(0) as u8;
    Some(TrackKey::SensorTrack { sac, sic, track })
}

// ---------------------------------------------------------------------------
// Track events (output)
// ---------------------------------------------------------------------------

/// Events emitted by the tracker for the caller to log or persist.
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// First report correlated to this key.
    NewTrack { key: TrackKey, tod_s: f64 },
    /// The track's last-seen time moved forward.
    TrackUpdate { key: TrackKey, tod_s: f64 },
    /// A georeferenced position to store (after downsampling).
    PositionUpdate {
        key: TrackKey,
        lat: f64,
        lon: f64,
        flight_level: Option<f64>,
        speed_kts: Option<f64>,
        heading_deg: Option<f64>,
        tod_s: f64,
    },
}

// ---------------------------------------------------------------------------
// Track state
// ---------------------------------------------------------------------------

/// Mutable state for a single track.
#[derive(Debug, Clone)]
pub struct TrackState {
    pub key: TrackKey,
    pub squawk: Option<String>,
    pub flight_level: Option<f64>,

    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,

    /// Time of day (seconds since midnight) of the first/latest report.
    pub first_seen: f64,
    pub last_seen: f64,
    pub record_count: u64,

    /// (tod_s, lat, lon) of recent fixes, bounded by `MAX_HISTORY`.
    pub position_history: Vec<(f64, f64, f64)>,
}

impl TrackState {
    pub fn new(key: TrackKey, tod_s: f64) -> Self {
        TrackState {
            key,
            squawk: None,
            flight_level: None,
            lat: None,
            lon: None,
            speed_kts: None,
            heading_deg: None,
            first_seen: tod_s,
            last_seen: tod_s,
            record_count: 0,
            position_history: Vec::new(),
        }
    }

    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_seen
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Correlate decoded records into tracks.
///
/// Pure state machine: feed records in decode order, get back events. The
/// caller decides what to do with them.
pub struct Tracker {
    pub tracks: HashMap<TrackKey, TrackState>,
    /// Radar site, needed to georeference polar plots.
    pub site_lat: Option<f64>,
    pub site_lon: Option<f64>,
    pub ttl_s: f64,
    pub min_position_interval: f64,

    // Last stored position time per track (for downsampling)
    last_stored: HashMap<TrackKey, f64>,

    // Counters
    pub total_records: u64,
    pub target_reports: u64,
    pub position_fixes: u64,
    pub positions_skipped: u64,
}

impl Tracker {
    pub fn new(
        site_lat: Option<f64>,
        site_lon: Option<f64>,
        ttl_s: f64,
        min_position_interval: f64,
    ) -> Self {
        Tracker {
            tracks: HashMap::new(),
            site_lat,
            site_lon,
            ttl_s,
            min_position_interval,
            last_stored: HashMap::new(),
            total_records: 0,
            target_reports: 0,
            position_fixes: 0,
            positions_skipped: 0,
        }
    }

    /// Process one decoded record. Returns events for the caller.
    ///
    /// Records that carry no track identity (service messages, unknown
    /// categories) count but produce nothing.
    pub fn update(&mut self, record: &Record) -> Vec<TrackEvent> {
        self.total_records += 1;
        let mut events = Vec::new();

        let Some(key) = track_key(record) else {
            return events;
        };
        self.target_reports += 1;

        let is_new = !self.tracks.contains_key(&key);
        if is_new {
            let tod = record.field_f64("I048/140", "seconds").unwrap_or(0.0);
            events.push(TrackEvent::NewTrack {
                key: key.clone(),
                tod_s: tod,
            });
            self.tracks.insert(key.clone(), TrackState::new(key.clone(), tod));
        }

        let ac = self.tracks.get_mut(&key).unwrap();
        let tod = record
            .field_f64("I048/140", "seconds")
            .unwrap_or(ac.last_seen);
        ac.last_seen = tod;
        ac.record_count += 1;

        if let Some(code) = record.field_str("I048/070", "code") {
            ac.squawk = Some(code.to_string());
        }
        if let Some(fl) = record.field_f64("I048/090", "flight_level") {
            ac.flight_level = Some(fl);
        }
        if let Some(spd) = record.field_f64("I048/200", "speed_kts") {
            ac.speed_kts = Some(spd);
        }
        if let Some(hdg) = record.field_f64("I048/200", "heading_deg") {
            ac.heading_deg = Some(hdg);
        }

        // Georeference when the site is known
        if let (Some(site_lat), Some(site_lon)) = (self.site_lat, self.site_lon) {
            if let Some(fix) = geo::enrich(record, site_lat, site_lon) {
                ac.lat = Some(fix.lat);
                ac.lon = Some(fix.lon);
                self.position_fixes += 1;

                ac.position_history.push((tod, fix.lat, fix.lon));
                if ac.position_history.len() > MAX_HISTORY {
                    let start = ac.position_history.len() - MAX_HISTORY;
                    ac.position_history = ac.position_history[start..].to_vec();
                }

                // Downsample: only emit if enough time passed since the last
                // stored position for this track.
                let last = self.last_stored.get(&key).copied();
                if last.is_none() || tod - last.unwrap() >= self.min_position_interval {
                    events.push(TrackEvent::PositionUpdate {
                        key: key.clone(),
                        lat: fix.lat,
                        lon: fix.lon,
                        flight_level: ac.flight_level,
                        speed_kts: ac.speed_kts,
                        heading_deg: ac.heading_deg,
                        tod_s: tod,
                    });
                    self.last_stored.insert(key.clone(), tod);
                } else {
                    self.positions_skipped += 1;
                }
            }
        }

        events.push(TrackEvent::TrackUpdate { key, tod_s: tod });
        events
    }

    /// All non-stale tracks, most recently seen first.
    pub fn get_active(&self, now: f64) -> Vec<&TrackState> {
        let mut active: Vec<_> = self
            .tracks
            .values()
            .filter(|ac| ac.age(now) <= self.ttl_s)
            .collect();
        active.sort_by(|a, b| b.last_seen.partial_cmp(&a.last_seen).unwrap());
        active
    }

    /// Forget tracks silent past the TTL. Returns the count removed.
    pub fn prune_stale(&mut self, now: f64) -> usize {
        let ttl = self.ttl_s;
        let before = self.tracks.len();
        self.tracks.retain(|_, ac| now - ac.last_seen <= ttl);
        self.last_stored
            .retain(|key, _| self.tracks.contains_key(key));
        before - self.tracks.len()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new(None, None, STALE_TTL_S, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Decoder;

    /// CAT048 record with data source, polar position, time of day, and
    /// aircraft address.
    fn target_report(tod_raw: u32, rho: u16, theta: u16, addr: [u8; 3]) -> Vec<u8> {
        let mut buf = vec![0x30, 0x00, 0x11]; // header, length 17
        buf.extend_from_slice(&[0xA3, 0x80]); // FSPEC: positions 1,3,7,8
        buf.extend_from_slice(&[0x12, 0x34]); // I048/010
        buf.extend_from_slice(&rho.to_be_bytes());
        buf.extend_from_slice(&theta.to_be_bytes()); // I048/040
        buf.extend_from_slice(&tod_raw.to_be_bytes()[1..]); // I048/140
        buf.extend_from_slice(&addr); // I048/220
        buf
    }

    fn decode(buf: &[u8]) -> Record {
        Decoder::standard().decode_record(buf, 0).unwrap().0
    }

    fn make_tracker() -> Tracker {
        Tracker::new(Some(50.0), Some(4.0), STALE_TTL_S, 0.0)
    }

    #[test]
    fn test_new_track_event() {
        let mut tracker = make_tracker();
        let record = decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC]));
        let events = tracker.update(&record);
        assert!(events
            .iter()
            .any(|e| matches!(e, TrackEvent::NewTrack { .. })));
        assert_eq!(tracker.tracks.len(), 1);
    }

    #[test]
    fn test_keyed_by_address() {
        let mut tracker = make_tracker();
        let record = decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC]));
        tracker.update(&record);
        let key = TrackKey::Address("AABBCC".into());
        let ac = &tracker.tracks[&key];
        assert_eq!(ac.record_count, 1);
        assert!((ac.last_seen - 1.0).abs() < 1e-9);
        assert!(ac.has_position());
    }

    #[test]
    fn test_sensor_track_fallback() {
        // No aircraft address: key is (sac, sic, track number).
        let buf = [
            0x30, 0x00, 0x09, // header
            0x81, 0x10, // FSPEC: I048/010 + I048/161
            0x12, 0x34, // I048/010
            0x04, 0xD2, // I048/161: track 1234
        ];
        let mut tracker = make_tracker();
        tracker.update(&decode(&buf));
        let key = TrackKey::SensorTrack {
            sac: 0x12,
            sic: 0x34,
            track: 1234,
        };
        assert!(tracker.tracks.contains_key(&key));
        assert_eq!(key.to_string(), "18/52#1234");
    }

    #[test]
    fn test_service_record_ignored() {
        // CAT034 North Marker: counted, but no track comes of it.
        let buf = [0x22, 0x00, 0x05, 0x40, 0x01];
        let mut tracker = make_tracker();
        let events = tracker.update(&decode(&buf));
        assert!(events.is_empty());
        assert_eq!(tracker.total_records, 1);
        assert_eq!(tracker.target_reports, 0);
    }

    #[test]
    fn test_position_update_event() {
        let mut tracker = make_tracker();
        let record = decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC]));
        let events = tracker.update(&record);
        let pos = events.iter().find_map(|e| match e {
            TrackEvent::PositionUpdate { lat, lon, .. } => Some((*lat, *lon)),
            _ => None,
        });
        let (lat, lon) = pos.expect("should emit PositionUpdate");
        // 10 NM due east of the site
        assert!((lat - 50.0).abs() < 0.01);
        assert!(lon > 4.0);
        assert_eq!(tracker.position_fixes, 1);
    }

    #[test]
    fn test_no_position_without_site() {
        let mut tracker = Tracker::default();
        let record = decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC]));
        let events = tracker.update(&record);
        assert!(!events
            .iter()
            .any(|e| matches!(e, TrackEvent::PositionUpdate { .. })));
        assert_eq!(tracker.position_fixes, 0);
        assert!(!tracker.tracks[&TrackKey::Address("AABBCC".into())].has_position());
    }

    #[test]
    fn test_position_downsampling() {
        let mut tracker = Tracker::new(Some(50.0), Some(4.0), STALE_TTL_S, 5.0);
        let addr = [0xAA, 0xBB, 0xCC];
        // tod 1 s → stored; tod 2 s → skipped; tod 8 s → stored
        tracker.update(&decode(&target_report(128, 2560, 16384, addr)));
        tracker.update(&decode(&target_report(256, 2560, 16384, addr)));
        tracker.update(&decode(&target_report(1024, 2560, 16384, addr)));
        assert_eq!(tracker.position_fixes, 3);
        assert_eq!(tracker.positions_skipped, 1);
    }

    #[test]
    fn test_prune_stale() {
        let mut tracker = make_tracker();
        tracker.update(&decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC])));
        // 1280/128 = 10 s: second target shows up later
        tracker.update(&decode(&target_report(1280, 2560, 8192, [0x11, 0x22, 0x33])));
        assert_eq!(tracker.tracks.len(), 2);

        // At t=65 the first track (last seen t=1) is past the 60 s TTL.
        assert_eq!(tracker.prune_stale(65.0), 1);
        assert_eq!(tracker.tracks.len(), 1);
        assert!(tracker
            .tracks
            .contains_key(&TrackKey::Address("112233".into())));
    }

    #[test]
    fn test_get_active_sorted() {
        let mut tracker = make_tracker();
        tracker.update(&decode(&target_report(128, 2560, 16384, [0xAA, 0xBB, 0xCC])));
        tracker.update(&decode(&target_report(1280, 2560, 8192, [0x11, 0x22, 0x33])));

        let active = tracker.get_active(12.0);
        assert_eq!(active.len(), 2);
        // Most recent first
        assert_eq!(active[0].key, TrackKey::Address("112233".into()));

        // Past the TTL for the first track only
        assert_eq!(tracker.get_active(65.0).len(), 1);
    }

    #[test]
    fn test_track_fields_updated() {
        // Position + flight level + velocity + address.
        let buf = [
            0x30, 0x00, 0x17, // header, length 23
            0xAB, 0x84, // FSPEC: positions 1,3,5,7 + 8,13
            0x12, 0x34, // I048/010
            0x0A, 0x00, 0x40, 0x00, // I048/040
            0x00, 0xFA, // I048/090: FL 62.5
            0x00, 0x00, 0x80, // I048/140: 1 s
            0xAA, 0xBB, 0xCC, // I048/220
            0x40, 0x00, 0x20, 0x00, // I048/200: 3600 kt, 45 deg
        ];
        let mut tracker = make_tracker();
        tracker.update(&decode(&buf));
        let ac = &tracker.tracks[&TrackKey::Address("AABBCC".into())];
        assert_eq!(ac.flight_level, Some(62.5));
        assert_eq!(ac.speed_kts, Some(3600.0));
        assert_eq!(ac.heading_deg, Some(45.0));
        assert_eq!(ac.position_history.len(), 1);
    }
}
