//! Record orchestration and the stream decoder.
//!
//! A wire record is: 1-byte category, 2-byte big-endian length (counting the
//! whole record, header included), FSPEC, data items. The orchestrator walks
//! the FSPEC bits against the category's UAP, dispatching to registered item
//! decoders. Anything that would force a guess about item boundaries stops
//! the walk and lands in the record's diagnostics instead; only header,
//! FSPEC, or body truncation kills the stream, because past those there is
//! no trustworthy record boundary left.

use std::collections::BTreeMap;

use crate::bytes::hex_lower;
use crate::config::DecodeSettings;
use crate::fspec::read_fspec;
use crate::items::DecoderTable;
use crate::types::{AsterixError, DecodeFailure, Diagnostics, Record, Result};
use crate::uap::UapTable;

/// Record header size: category byte + 16-bit length.
const HEADER_LEN: usize = 3;

/// One decoding configuration: the UAP registry plus the decoder registry.
///
/// Build it once at startup (optionally registering extra categories or
/// decoders), then share it by reference across any number of buffers.
#[derive(Clone, Default)]
pub struct Decoder {
    pub uaps: UapTable,
    pub decoders: DecoderTable,
}

impl Decoder {
    /// The built-in CAT034/CAT048 configuration with default scaling.
    pub fn standard() -> Self {
        Decoder::with_settings(&DecodeSettings::default())
    }

    /// The built-in configuration with explicit scaling settings.
    pub fn with_settings(settings: &DecodeSettings) -> Self {
        Decoder {
            uaps: UapTable::standard(),
            decoders: DecoderTable::standard(settings),
        }
    }

    /// Decode one record at `offset`. Returns the record and the offset of
    /// the next one.
    pub fn decode_record(&self, buf: &[u8], offset: usize) -> Result<(Record, usize)> {
        // Header: category + declared length.
        let available = buf.len().saturating_sub(offset);
        if available < HEADER_LEN {
            return Err(AsterixError::TruncatedHeader { offset, available });
        }
        let category = buf[offset];
        let declared = u16::from_be_bytes([buf[offset + 1], buf[offset + 2]]) as usize;
        let end = offset + declared;
        // A length shorter than the header cannot frame a record, and taking
        // it at face value would pin the stream to this offset forever.
        if declared < HEADER_LEN || end > buf.len() {
            return Err(AsterixError::TruncatedRecordBody {
                offset,
                declared,
                available,
            });
        }

        let fspec = read_fspec(buf, offset + HEADER_LEN)?;
        let mut record = Record {
            category,
            declared_len: declared,
            fspec_hex: hex_lower(&fspec.bytes),
            items: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
        };
        let mut cursor = fspec.next;

        // Without a UAP no item boundary is knowable: keep the whole data
        // region for audit and move on to the next record.
        let Some(uap) = self.uaps.lookup(category) else {
            record.diagnostics.unknown_category = Some(hex_lower(&buf[cursor.min(end)..end]));
            return Ok((record, end));
        };

        for (position, &bit) in fspec.bits.iter().enumerate() {
            if !bit {
                continue;
            }
            // A set bit past the UAP means the bitmap tail cannot be trusted
            // to align with this profile; interpreting further risks silent
            // misalignment.
            let Some(item) = uap.get(position) else {
                record.diagnostics.excess_fspec_bit = true;
                break;
            };
            // The length of an undecodable item is unknowable, so the walk
            // cannot step over it.
            let Some(decoder) = self.decoders.lookup(category, item) else {
                record.diagnostics.missing_decoder = Some(item.clone());
                break;
            };
            match decoder(buf, cursor) {
                Ok((value, consumed)) => {
                    cursor += consumed;
                    if cursor > end {
                        // The declared record length is authoritative; an
                        // item extending past it indicates corruption.
                        record.diagnostics.overflow = Some(item.clone());
                        cursor = end;
                        break;
                    }
                    record.items.insert(item.clone(), value);
                }
                Err(short) => {
                    record.diagnostics.decode_error = Some(DecodeFailure {
                        item: item.clone(),
                        message: short.to_string(),
                    });
                    break;
                }
            }
        }

        if cursor < end {
            record.diagnostics.undecoded_tail = Some(hex_lower(&buf[cursor..end]));
        }

        Ok((record, end))
    }

    /// Lazily decode every record in `buf`, starting at offset 0.
    pub fn stream<'a>(&'a self, buf: &'a [u8]) -> RecordStream<'a> {
        RecordStream {
            decoder: self,
            buf,
            offset: 0,
            failed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Stream decoder
// ---------------------------------------------------------------------------

/// Lazy, finite, forward-only record sequence over one buffer.
///
/// A fatal error is yielded once and ends the iteration; records already
/// yielded remain valid.
pub struct RecordStream<'a> {
    decoder: &'a Decoder,
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for RecordStream<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }
        match self.decoder.decode_record(self.buf, self.offset) {
            Ok((record, next)) => {
                self.offset = next;
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
