//! Two-byte text decoding with byte-order resolution.
//!
//! Corpus files are UTF-16 but do not agree on byte order, and only some of
//! them carry a byte-order mark. A BOM picks the first candidate; otherwise
//! little-endian is tried before big-endian. A candidate is rejected on any
//! malformed sequence (odd length, unpaired surrogate), never repaired.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::path::Path;

use crate::error::IngestError;

const BOM_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_BE: [u8; 2] = [0xFE, 0xFF];

/// Decoded document text plus the encoding that produced it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Decode raw file bytes into text.
///
/// `path` is only used for diagnostics.
pub fn decode_document(bytes: &[u8], path: &Path) -> Result<Decoded, IngestError> {
    let (candidates, bom_len): ([&'static Encoding; 2], usize) = match bytes.get(..2) {
        Some(b) if b == BOM_LE => ([UTF_16LE, UTF_16BE], 2),
        Some(b) if b == BOM_BE => ([UTF_16BE, UTF_16LE], 2),
        _ => ([UTF_16LE, UTF_16BE], 0),
    };

    for (i, encoding) in candidates.iter().enumerate() {
        // The BOM only belongs to the encoding it announced.
        let input = if i == 0 { &bytes[bom_len..] } else { bytes };
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(input) {
            tracing::debug!(
                path = %path.display(),
                encoding = encoding.name(),
                bom = bom_len > 0,
                "decoded document"
            );
            return Ok(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
        tracing::debug!(
            path = %path.display(),
            encoding = encoding.name(),
            "candidate encoding rejected"
        );
    }

    Err(IngestError::Decode {
        tried: candidates
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
