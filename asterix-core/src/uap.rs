//! Per-category User Application Profiles.
//!
//! A UAP is the ordered list mapping FSPEC bit positions to data item
//! identifiers. The registry ships with the two monoradar categories this
//! library decodes and accepts further categories at setup time without any
//! change to the decoding logic.

use std::collections::HashMap;

/// CAT048 — monoradar target reports. One entry per FSPEC position.
pub const CAT048_UAP: &[&str] = &[
    "I048/010", // Data Source Identifier
    "I048/020", // Target Report Descriptor
    "I048/040", // Measured Position, Slant Polar
    "I048/070", // Mode-3/A Code
    "I048/090", // Flight Level
    "I048/130", // Radar Plot Characteristics
    "I048/140", // Time of Day
    "I048/220", // Aircraft Address
    "I048/240", // Aircraft Identification
    "I048/250", // Mode S MB Data
    "I048/161", // Track Number
    "I048/042", // Calculated Position, Cartesian
    "I048/200", // Calculated Track Velocity, Polar
    "I048/170", // Track Status
    "I048/210", // Track Quality
    "I048/030", // Warning/Error Conditions
    "I048/080", // Mode-3/A Confidence
    "I048/100", // Mode-C Code and Confidence
    "I048/110", // Height Measured by 3D Radar
    "I048/120", // Radial Doppler Speed
    "I048/230", // Communications/ACAS Capability
    "I048/260", // ACAS Resolution Advisory
    "I048/055", // Mode-1 Code
    "I048/050", // Mode-2 Code
    "I048/065", // Mode-1 Confidence
    "I048/060", // Mode-2 Confidence
    "I048/SP",  // Special Purpose Field
    "I048/RE",  // Reserved Expansion Field
];

/// CAT034 — monoradar service messages (North marker, sector crossings,
/// radar status). One entry per FSPEC position.
pub const CAT034_UAP: &[&str] = &[
    "I034/010", // Data Source Identifier
    "I034/000", // Message Type
    "I034/030", // Time of Day
    "I034/020", // Sector Number
    "I034/041", // Antenna Rotation Period
    "I034/050", // System Configuration and Status
    "I034/060", // System Processing Mode
    "I034/070", // Message Count Values
    "I034/100", // Generic Polar Window
    "I034/110", // Data Filter
    "I034/120", // 3D Position of Data Source
    "I034/090", // Collimation Error
    "I034/RE",  // Reserved Expansion Field
    "I034/SP",  // Special Purpose Field
];

/// Registry of category → UAP list.
///
/// Effectively immutable configuration: populate before decoding, then share
/// freely. Registering a category the table already knows replaces its list,
/// which is how a different category edition is swapped in.
#[derive(Debug, Clone, Default)]
pub struct UapTable {
    map: HashMap<u8, Vec<String>>,
}

impl UapTable {
    /// An empty registry.
    pub fn new() -> Self {
        UapTable {
            map: HashMap::new(),
        }
    }

    /// The built-in registry: CAT034 and CAT048.
    pub fn standard() -> Self {
        let mut table = UapTable::new();
        table.register(34, CAT034_UAP);
        table.register(48, CAT048_UAP);
        table
    }

    /// Register (or replace) the UAP for a category.
    pub fn register(&mut self, category: u8, items: &[&str]) {
        self.map
            .insert(category, items.iter().map(|s| s.to_string()).collect());
    }

    /// The ordered item list for a category, or `None` if not registered.
    pub fn lookup(&self, category: u8) -> Option<&[String]> {
        self.map.get(&category).map(|v| v.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
