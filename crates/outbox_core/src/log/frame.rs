//! Log frame encoding and parsing.

use crate::error::{CoreError, CoreResult};

/// Magic bytes identifying a log frame.
pub(crate) const FRAME_MAGIC: [u8; 4] = *b"OBXL";

/// Current frame format version.
pub(crate) const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + kind (1) + key_len (2) + value_len (4)
pub(crate) const HEADER_SIZE: usize = 13;

/// CRC size.
pub(crate) const CRC_SIZE: usize = 4;

/// Type of frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum FrameKind {
    /// Sets a key.
    Put = 1,
    /// Deletes a key.
    Remove = 2,
}

impl FrameKind {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Remove),
            _ => None,
        }
    }
}

/// A decoded frame borrowing from the scanned buffer.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Frame<'a> {
    pub kind: FrameKind,
    pub key: &'a str,
    pub value: &'a [u8],
}

/// Outcome of parsing the bytes at one offset.
#[derive(Debug)]
pub(crate) enum Parsed<'a> {
    /// A complete, valid frame of `len` bytes.
    Frame { frame: Frame<'a>, len: usize },
    /// The remaining bytes are the start of a frame that was never finished.
    TornTail,
    /// The bytes are damaged.
    Corrupt(String),
}

/// Encodes one frame.
pub(crate) fn encode(kind: FrameKind, key: &str, value: &[u8]) -> CoreResult<Vec<u8>> {
    let key_len = u16::try_from(key.len()).map_err(|_| {
        CoreError::invalid_argument(format!("key of {} bytes exceeds frame limit", key.len()))
    })?;
    let value_len = u32::try_from(value.len()).map_err(|_| {
        CoreError::invalid_argument(format!("value of {} bytes exceeds frame limit", value.len()))
    })?;

    let mut data = Vec::with_capacity(HEADER_SIZE + key.len() + value.len() + CRC_SIZE);
    data.extend_from_slice(&FRAME_MAGIC);
    data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    data.push(kind as u8);
    data.extend_from_slice(&key_len.to_le_bytes());
    data.extend_from_slice(&value_len.to_le_bytes());
    data.extend_from_slice(key.as_bytes());
    data.extend_from_slice(value);

    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

/// Parses the frame starting at the beginning of `buf`.
pub(crate) fn parse(buf: &[u8]) -> Parsed<'_> {
    if buf.len() < HEADER_SIZE {
        // A header cut short can only be the tail of an interrupted append,
        // unless even the magic we did get is wrong.
        let seen = buf.len().min(FRAME_MAGIC.len());
        if buf[..seen] != FRAME_MAGIC[..seen] {
            return Parsed::Corrupt("invalid magic".into());
        }
        return Parsed::TornTail;
    }

    if buf[0..4] != FRAME_MAGIC {
        return Parsed::Corrupt("invalid magic".into());
    }

    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version > FRAME_VERSION {
        return Parsed::Corrupt(format!("unsupported frame version {version}"));
    }

    let Some(kind) = FrameKind::from_byte(buf[6]) else {
        return Parsed::Corrupt(format!("unknown frame kind {}", buf[6]));
    };

    let key_len = u16::from_le_bytes([buf[7], buf[8]]) as usize;
    let value_len = u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]) as usize;
    let total = HEADER_SIZE + key_len + value_len + CRC_SIZE;

    if buf.len() < total {
        return Parsed::TornTail;
    }

    let body_end = HEADER_SIZE + key_len + value_len;
    let stored_crc = u32::from_le_bytes([
        buf[body_end],
        buf[body_end + 1],
        buf[body_end + 2],
        buf[body_end + 3],
    ]);
    let computed_crc = compute_crc32(&buf[..body_end]);
    if stored_crc != computed_crc {
        return Parsed::Corrupt(format!(
            "checksum mismatch: expected {stored_crc:08x}, got {computed_crc:08x}"
        ));
    }

    let Ok(key) = std::str::from_utf8(&buf[HEADER_SIZE..HEADER_SIZE + key_len]) else {
        return Parsed::Corrupt("key is not valid UTF-8".into());
    };

    Parsed::Frame {
        frame: Frame {
            kind,
            key,
            value: &buf[HEADER_SIZE + key_len..body_end],
        },
        len: total,
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial, table built at compile time
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
