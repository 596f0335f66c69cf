//! RFID tag decoding
//!
//! The controller stores the tag of the current session as ASCII text
//! packed four bytes per 32-bit value across five register pairs.

use crate::config::RegisterSpec;
use crate::logging::get_logger;
use crate::registers::RegisterReader;
use std::fmt;

/// Text used wherever no tag is available
pub const EMPTY_TAG: &str = "<LEER>";

/// Decoded RFID tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfidTag {
    Present(String),
    /// No tag stored, or nothing could be read
    Empty,
}

impl RfidTag {
    /// Build a tag from assembled text, collapsing blank or all-NUL text
    pub fn from_text(text: String) -> Self {
        if text.is_empty() || text.chars().all(|c| c == '\0') {
            RfidTag::Empty
        } else {
            RfidTag::Present(text)
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, RfidTag::Present(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            RfidTag::Present(s) => s,
            RfidTag::Empty => EMPTY_TAG,
        }
    }

    /// Tag text without the NUL padding the controller leaves at the end
    pub fn printable(&self) -> &str {
        self.as_str().trim_end_matches('\0')
    }
}

impl fmt::Display for RfidTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four big-endian bytes as ASCII; non-ASCII bytes are dropped and leading
/// whitespace is trimmed. Trailing NULs are kept.
pub fn chunk_to_ascii(value: u32) -> String {
    let text: String = value
        .to_be_bytes()
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    text.trim_start().to_string()
}

/// Outcome of a tag read, with the number of chunks that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRead {
    pub tag: RfidTag,
    pub failed_chunks: usize,
}

/// Read and assemble the tag. A chunk that cannot be read contributes
/// nothing; the remaining chunks are still used.
pub async fn decode(reader: &mut RegisterReader<'_>, registers: &[RegisterSpec; 5]) -> TagRead {
    let logger = get_logger("tag");
    let mut text = String::new();
    let mut failed_chunks = 0;

    for spec in registers {
        match reader.read_spec(*spec).await {
            Ok(value) => text.push_str(&chunk_to_ascii(value)),
            Err(e) => {
                failed_chunks += 1;
                logger.warn(&format!(
                    "Skipping tag chunk at {}: {}",
                    spec.address, e
                ));
            }
        }
    }

    let tag = RfidTag::from_text(text);
    logger.debug(&format!(
        "Decoded tag {:?} ({} failed chunks)",
        tag.as_str(),
        failed_chunks
    ));
    TagRead { tag, failed_chunks }
}
