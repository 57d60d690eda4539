//! Confluent wire format header for protobuf payloads.
//!
//! ```text
//! [0x00][schema id: u32 BE][message-index path][protobuf payload]
//! ```
//!
//! The index path is a zigzag varint count followed by zigzag varint
//! indexes. The common path `[0]` is written as a single `0` byte, and a
//! count of zero is read back as `[0]`. An empty path is the same as `[0]`.

use bytes::{Buf, BufMut};
use prost::encoding::{decode_varint, encode_varint};
use thiserror::Error;

/// First byte of every framed payload.
pub const MAGIC_BYTE: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("payload too short for a schema header ({0} bytes)")]
    TooShort(usize),

    #[error("unknown magic byte {0:#04x}")]
    BadMagic(u8),

    #[error("malformed message-index path: {0}")]
    BadIndex(String),
}

/// Append the header for `schema_id` and `index` to `buf`.
pub fn encode_header(buf: &mut Vec<u8>, schema_id: u32, index: &[i32]) {
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);

    if index.is_empty() || index == [0] {
        buf.put_u8(0);
        return;
    }
    encode_varint(zigzag(index.len() as i64), buf);
    for &i in index {
        encode_varint(zigzag(i64::from(i)), buf);
    }
}

/// Split a framed payload into schema ID, index path and protobuf bytes.
pub fn decode_header(mut bytes: &[u8]) -> Result<(u32, Vec<i32>, &[u8]), WireError> {
    if bytes.len() < 5 {
        return Err(WireError::TooShort(bytes.len()));
    }
    let magic = bytes.get_u8();
    if magic != MAGIC_BYTE {
        return Err(WireError::BadMagic(magic));
    }
    let schema_id = bytes.get_u32();

    let count = read_zigzag(&mut bytes)?;
    let index = if count == 0 {
        vec![0]
    } else {
        if count < 0 || count as usize > bytes.len() {
            return Err(WireError::BadIndex(format!("count {}", count)));
        }
        (0..count)
            .map(|_| {
                let i = read_zigzag(&mut bytes)?;
                i32::try_from(i).map_err(|_| WireError::BadIndex(format!("index {}", i)))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok((schema_id, index, bytes))
}

fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

fn read_zigzag(bytes: &mut &[u8]) -> Result<i64, WireError> {
    decode_varint(bytes)
        .map(unzigzag)
        .map_err(|e| WireError::BadIndex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_shortcut() {
        let mut buf = Vec::new();
        encode_header(&mut buf, 42, &[0]);
        assert_eq!(buf, vec![0, 0, 0, 0, 42, 0]);

        let (id, index, rest) = decode_header(&buf).unwrap();
        assert_eq!(id, 42);
        assert_eq!(index, vec![0]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_empty_path_is_first_message() {
        let mut empty = Vec::new();
        encode_header(&mut empty, 42, &[]);
        let mut first = Vec::new();
        encode_header(&mut first, 42, &[0]);

        assert_eq!(empty, first);
        let (_, index, _) = decode_header(&empty).unwrap();
        assert_eq!(index, vec![0]);
    }

    #[test]
    fn test_nested_index_path() {
        let mut buf = Vec::new();
        encode_header(&mut buf, 7, &[1, 2]);
        buf.extend_from_slice(b"payload");

        // count 2 → 4, 1 → 2, 2 → 4 after zigzag
        assert_eq!(&buf[5..8], &[4, 2, 4]);
        let (id, index, rest) = decode_header(&buf).unwrap();
        assert_eq!(id, 7);
        assert_eq!(index, vec![1, 2]);
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn test_rejects_bad_frames() {
        assert_eq!(decode_header(&[0, 0, 1]), Err(WireError::TooShort(3)));
        assert_eq!(decode_header(&[9, 0, 0, 0, 1, 0]), Err(WireError::BadMagic(9)));
        assert!(matches!(decode_header(&[0, 0, 0, 0, 1]), Err(WireError::BadIndex(_))));
        assert!(matches!(
            decode_header(&[0, 0, 0, 0, 1, 40]),
            Err(WireError::BadIndex(_))
        ));
    }

    #[test]
    fn test_zigzag() {
        for n in [0i64, 1, -1, 63, -64, i32::MAX as i64] {
            assert_eq!(unzigzag(zigzag(n)), n);
        }
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
    }
}
