//! Configuration file management for asterix-decode.
//!
//! Reads/writes `~/.asterix-decode/config.yaml` with the radar site position
//! and decoding scale overrides.

use std::path::PathBuf;

use crate::items::DEFAULT_VELOCITY_LSB_NM_S;
use crate::types::AsterixError;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub decode: DecodeSettings,
}

/// Radar site identity and position.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Scale factors that vary by category edition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeSettings {
    /// Track-velocity LSB in NM/s per raw unit.
    pub velocity_lsb_nm_s: f64,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        DecodeSettings {
            velocity_lsb_nm_s: DEFAULT_VELOCITY_LSB_NM_S,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site: SiteConfig {
                name: "default".into(),
                lat: None,
                lon: None,
            },
            decode: DecodeSettings::default(),
        }
    }
}

/// Get the config directory path (`~/.asterix-decode/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".asterix-decode")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.asterix-decode/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text).unwrap_or_default()
}

/// Save config to `~/.asterix-decode/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AsterixError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| AsterixError::Config(e.to_string()))?;

    let path = config_file();
    let text = serialize_config(config);
    std::fs::write(&path, text).map_err(|e| AsterixError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text.
fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                if val.is_empty() {
                    current_section = Some(key.to_string());
                } else {
                    current_section = None;
                }
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "site" => match key {
                        "name" => {
                            if let Some(v) = parse_string_value(val) {
                                config.site.name = v;
                            }
                        }
                        "lat" => config.site.lat = parse_float_value(val),
                        "lon" => config.site.lon = parse_float_value(val),
                        _ => {}
                    },
                    "decode" => {
                        if key == "velocity_lsb" {
                            if let Some(v) = parse_float_value(val) {
                                config.decode.velocity_lsb_nm_s = v;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Some(config)
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if (val.starts_with('"') && val.ends_with('"'))
        || (val.starts_with('\'') && val.ends_with('\''))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# asterix-decode configuration".to_string(), String::new()];

    lines.push("site:".into());
    lines.push(format!("  name: \"{}\"", config.site.name));
    match config.site.lat {
        Some(v) => lines.push(format!("  lat: {v}")),
        None => lines.push("  lat: null".into()),
    }
    match config.site.lon {
        Some(v) => lines.push(format!("  lon: {v}")),
        None => lines.push("  lon: null".into()),
    }
    lines.push(String::new());

    lines.push("decode:".into());
    lines.push(format!("  velocity_lsb: {}", config.decode.velocity_lsb_nm_s));
    lines.push(String::new());

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
