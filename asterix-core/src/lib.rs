//! asterix-core: Pure decode + tracking library for ASTERIX surveillance data.
//!
//! No async, no I/O — just algorithms. This crate is the shared core used by
//! `asterix-replay` and anything else consuming decoded record streams.

pub mod bytes;
pub mod config;
pub mod fspec;
pub mod geo;
pub mod items;
pub mod record;
pub mod tracker;
pub mod types;
pub mod uap;

// Re-export commonly used types at crate root
pub use config::{Config, DecodeSettings, SiteConfig};
pub use items::DecoderTable;
pub use record::{Decoder, RecordStream};
pub use tracker::{TrackEvent, TrackKey, TrackState, Tracker};
pub use types::*;
pub use uap::UapTable;
