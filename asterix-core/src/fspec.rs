//! FSPEC presence-bitmap decoding.
//!
//! Every record's data items are preceded by a continuation-chained bitmap:
//! each octet carries seven presence bits (MSB first) plus an FX bit in the
//! least-significant position announcing another octet. Bit *i* of the
//! flattened sequence corresponds positionally to entry *i* of the
//! category's UAP.

use crate::bytes::read_chained;
use crate::types::{AsterixError, Result};

/// A decoded presence bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fspec {
    /// The raw chained octets, FX bits included.
    pub bytes: Vec<u8>,
    /// Offset of the first data item byte.
    pub next: usize,
    /// Flattened presence bits, 7 per octet, in encounter order.
    ///
    /// Always a multiple of 7 long, and may run past the UAP of any given
    /// category — trailing excess is for the caller to judge, not an error
    /// here.
    pub bits: Vec<bool>,
}

impl Fspec {
    /// Indices of the set bits, i.e. the occupied UAP positions.
    pub fn set_positions(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Read the FSPEC starting at `start`.
///
/// Fails with [`AsterixError::TruncatedFspec`] when the chain runs off the
/// end of the buffer.
pub fn read_fspec(buf: &[u8], start: usize) -> Result<Fspec> {
    let (octets, next) =
        read_chained(buf, start).map_err(|_| AsterixError::TruncatedFspec { offset: start })?;

    let mut bits = Vec::with_capacity(octets.len() * 7);
    for &octet in octets {
        for shift in (1..=7).rev() {
            bits.push(octet & (1 << shift) != 0);
        }
    }

    Ok(Fspec {
        bytes: octets.to_vec(),
        next,
        bits,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
