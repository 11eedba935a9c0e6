//! asterix-replay: Read recorded ASTERIX captures and re-emit decoded logs.
//!
//! Supports:
//! - Dumping every record in a capture, as text or JSON lines
//! - Correlating target reports into tracks with geodetic enrichment
//!
//! Captures are plain concatenated wire records — no delimiters, record
//! boundaries come from the declared-length headers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use asterix_core::config;
use asterix_core::record::Decoder;
use asterix_core::tracker::{TrackEvent, Tracker};

#[derive(Parser)]
#[command(
    name = "asterix-replay",
    version,
    about = "ASTERIX capture replay and track correlation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file and print every record
    Dump {
        /// Path to a raw ASTERIX capture (concatenated records)
        file: PathBuf,

        /// Emit one JSON object per record instead of text
        #[arg(short, long)]
        json: bool,
    },
    /// Correlate target reports into tracks and print the track log
    Track {
        /// Path to a raw ASTERIX capture
        file: PathBuf,

        /// Radar site latitude (falls back to the config file)
        #[arg(long)]
        lat: Option<f64>,

        /// Radar site longitude (falls back to the config file)
        #[arg(long)]
        lon: Option<f64>,

        /// Track time-to-live in seconds
        #[arg(long, default_value_t = 60.0)]
        ttl: f64,

        /// Minimum seconds between stored positions per track
        #[arg(long, default_value_t = 0.0)]
        interval: f64,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { file, json } => cmd_dump(file, json),
        Commands::Track {
            file,
            lat,
            lon,
            ttl,
            interval,
        } => cmd_track(file, lat, lon, ttl, interval),
    }
}

fn read_capture(file: &PathBuf) -> Vec<u8> {
    match std::fs::read(file) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("Error reading {}: {e}", file.display());
            std::process::exit(1);
        }
    }
}

fn cmd_dump(file: PathBuf, json: bool) {
    let buf = read_capture(&file);
    eprintln!("Decoding: {} ({} bytes)", file.display(), buf.len());

    let settings = config::load_config().decode;
    let decoder = Decoder::with_settings(&settings);

    let mut records = 0u64;
    let mut items = 0u64;
    let mut flagged = 0u64;

    for result in decoder.stream(&buf) {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        records += 1;
        items += record.items.len() as u64;
        if !record.diagnostics.is_clean() {
            flagged += 1;
        }

        if json {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error serializing record: {e}"),
            }
        } else {
            println!(
                "CAT{:03} len={} fspec={}",
                record.category, record.declared_len, record.fspec_hex
            );
            for (id, value) in &record.items {
                println!("  {id} {value}");
            }
            if !record.diagnostics.is_clean() {
                println!("  ! {}", record.diagnostics.labels().join(", "));
            }
        }
    }

    eprintln!("{records} records, {items} items, {flagged} with diagnostics");
}

fn cmd_track(file: PathBuf, lat: Option<f64>, lon: Option<f64>, ttl: f64, interval: f64) {
    let buf = read_capture(&file);

    let config = config::load_config();
    let site_lat = lat.or(config.site.lat);
    let site_lon = lon.or(config.site.lon);
    if site_lat.is_none() || site_lon.is_none() {
        eprintln!("No site position (--lat/--lon or config file): positions disabled");
    }

    let decoder = Decoder::with_settings(&config.decode);
    let mut tracker = Tracker::new(site_lat, site_lon, ttl, interval);

    for result in decoder.stream(&buf) {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        for event in tracker.update(&record) {
            match event {
                TrackEvent::NewTrack { key, tod_s } => {
                    println!("[{tod_s:9.2}] new track {key}");
                }
                TrackEvent::PositionUpdate {
                    key,
                    lat,
                    lon,
                    flight_level,
                    tod_s,
                    ..
                } => {
                    println!(
                        "[{tod_s:9.2}] {key} pos={lat:.4},{lon:.4} fl={}",
                        fmt_opt(flight_level)
                    );
                }
                TrackEvent::TrackUpdate { .. } => {}
            }
        }
    }

    let now = tracker
        .tracks
        .values()
        .map(|ac| ac.last_seen)
        .fold(0.0, f64::max);

    println!();
    println!(
        "{:<16} {:>6} {:>7} {:>7} {:>6} {:>10} {:>6}",
        "track", "squawk", "fl", "kts", "hdg", "last-seen", "msgs"
    );
    for ac in tracker.get_active(now) {
        println!(
            "{:<16} {:>6} {:>7} {:>7} {:>6} {:>10.2} {:>6}",
            ac.key.to_string(),
            ac.squawk.as_deref().unwrap_or("-"),
            fmt_opt(ac.flight_level),
            fmt_opt(ac.speed_kts),
            fmt_opt(ac.heading_deg),
            ac.last_seen,
            ac.record_count
        );
    }

    eprintln!(
        "{} records, {} target reports, {} tracks, {} fixes ({} downsampled)",
        tracker.total_records,
        tracker.target_reports,
        tracker.tracks.len(),
        tracker.position_fixes,
        tracker.positions_skipped
    );
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.1}"),
        None => "-".into(),
    }
}
