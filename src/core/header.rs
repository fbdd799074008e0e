//! Sans-IO codec for the asar header.
//!
//! The header is two nested length-prefixed records ("pickles"). All
//! integers are little-endian u32.
//!
//! ```text
//! [0..4)    4               size of the size pickle's payload (constant)
//! [4..8)    outer_len       length of the header pickle that follows
//! [8..12)   4 + aligned     header pickle payload length
//! [12..16)  text_len        byte length of the JSON index
//! [16..)    JSON index, zero padded to a multiple of 4
//! ```
//!
//! The payload region starts at `8 + outer_len`.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::node::DirectoryNode;
use super::reader::ArchiveIndex;
use crate::error::{AsarError, Result};

/// Length of the size pickle at the start of the archive.
pub const PREFIX_SIZE: u64 = 8;

/// The size pickle always declares a 4 byte payload.
const SIZE_PICKLE_PAYLOAD: u32 = 4;

const ALIGNMENT: usize = 4;

#[inline]
fn align(len: usize) -> usize {
    len + (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Read `outer_len` from the first 8 bytes of an archive.
pub fn decode_prefix(buf: &[u8]) -> Result<u32> {
    if buf.len() < PREFIX_SIZE as usize {
        return Err(AsarError::corrupt(format!(
            "header prefix needs {} bytes, got {}",
            PREFIX_SIZE,
            buf.len()
        )));
    }
    Ok(LittleEndian::read_u32(&buf[4..8]))
}

/// Parse the header pickle (archive bytes `[8, 8 + outer_len)`) into an index.
pub fn decode_index(outer_len: u32, pickle: &[u8]) -> Result<ArchiveIndex> {
    if pickle.len() as u64 != outer_len as u64 {
        return Err(AsarError::corrupt(format!(
            "header declares {} bytes but {} were read",
            outer_len,
            pickle.len()
        )));
    }
    if pickle.len() < 8 {
        return Err(AsarError::corrupt("header pickle is too short"));
    }

    let text_len = LittleEndian::read_u32(&pickle[4..8]) as usize;
    let text = pickle
        .get(8..8 + text_len)
        .ok_or_else(|| AsarError::corrupt(format!("index text length {} overflows header", text_len)))?;
    let text = std::str::from_utf8(text)
        .map_err(|_| AsarError::corrupt("index text is not valid UTF-8"))?;

    let root: DirectoryNode = serde_json::from_str(text).map_err(AsarError::CorruptIndex)?;
    root.validate_names()?;

    Ok(ArchiveIndex::new(root, PREFIX_SIZE + outer_len as u64))
}

/// Encode `root` as a complete header, ready to be followed by the payload region.
pub fn encode(root: &DirectoryNode) -> Result<Vec<u8>> {
    let text = serde_json::to_string(root).map_err(AsarError::CorruptIndex)?;
    encode_text(&text)
}

/// Frame already-serialized index text.
pub fn encode_text(text: &str) -> Result<Vec<u8>> {
    let text_len = text.len();
    let aligned_len = align(text_len);
    let pickle_len = 8 + aligned_len;

    let too_large = || AsarError::corrupt(format!("index of {} bytes is too large", text_len));
    let payload_len = u32::try_from(4 + aligned_len).map_err(|_| too_large())?;
    let pickle_len_u32 = u32::try_from(pickle_len).map_err(|_| too_large())?;

    let mut buf = Vec::with_capacity(PREFIX_SIZE as usize + pickle_len);
    buf.write_u32::<LittleEndian>(SIZE_PICKLE_PAYLOAD)?;
    buf.write_u32::<LittleEndian>(pickle_len_u32)?;
    buf.write_u32::<LittleEndian>(payload_len)?;
    buf.write_u32::<LittleEndian>(text_len as u32)?;
    buf.extend_from_slice(text.as_bytes());
    buf.resize(PREFIX_SIZE as usize + pickle_len, 0);

    Ok(buf)
}
