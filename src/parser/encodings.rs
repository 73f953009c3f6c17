//! Packed value encodings embedded in RDB strings.
//!
//! Small collections are stored as a single blob in one of several compact
//! layouts. Each decoder here walks such a blob and returns its elements in
//! order. Integers stay integers; [`Entry::byte_len`] measures them by their
//! decimal rendering.

use crate::utils::error::DecodeError;

/// One element of a packed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Bytes(&'a [u8]),
    Int(i64),
}

impl Entry<'_> {
    /// Payload length of the element as the server would report it
    pub fn byte_len(&self) -> u64 {
        match self {
            Entry::Bytes(bytes) => bytes.len() as u64,
            Entry::Int(value) => value.to_string().len() as u64,
        }
    }
}

/// Bounds-checked cursor over a packed blob
struct Blob<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Blob<'a> {
    fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    fn corrupt(&self, detail: &str) -> DecodeError {
        DecodeError::Corrupt(format!("{} at offset {}: {}", self.what, self.pos, detail))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.corrupt("entry runs past end of blob"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.corrupt("missing end marker"))
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u32_be(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i16_le(&mut self) -> Result<i64, DecodeError> {
        Ok(i16::from_le_bytes(self.array()?) as i64)
    }

    fn i24_le(&mut self) -> Result<i64, DecodeError> {
        let [b0, b1, b2] = self.array::<3>()?;
        Ok((i32::from_le_bytes([0, b0, b1, b2]) >> 8) as i64)
    }

    fn i32_le(&mut self) -> Result<i64, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?) as i64)
    }

    fn i64_le(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array()?))
    }
}

const ZIPLIST_END: u8 = 0xFF;
const ZIPLIST_BIG_PREVLEN: u8 = 0xFE;

/// Decode a ziplist (lists, hashes and sorted sets before Redis 7)
pub fn ziplist_entries(data: &[u8]) -> Result<Vec<Entry<'_>>, DecodeError> {
    let mut blob = Blob::new(data, "ziplist");
    // zlbytes, zltail
    blob.take(8)?;
    let declared = blob.u16_le()?;
    let mut entries = Vec::with_capacity(declared as usize);

    while blob.peek()? != ZIPLIST_END {
        if blob.u8()? == ZIPLIST_BIG_PREVLEN {
            blob.take(4)?;
        }

        let encoding = blob.u8()?;
        let entry = match encoding >> 6 {
            0b00 => Entry::Bytes(blob.take((encoding & 0x3F) as usize)?),
            0b01 => {
                let low = blob.u8()? as usize;
                Entry::Bytes(blob.take((((encoding & 0x3F) as usize) << 8) | low)?)
            }
            0b10 => {
                let len = blob.u32_be()? as usize;
                Entry::Bytes(blob.take(len)?)
            }
            _ => match encoding {
                0xC0 => Entry::Int(blob.i16_le()?),
                0xD0 => Entry::Int(blob.i32_le()?),
                0xE0 => Entry::Int(blob.i64_le()?),
                0xF0 => Entry::Int(blob.i24_le()?),
                0xFE => Entry::Int(blob.u8()? as i8 as i64),
                // 4-bit immediate, stored off by one
                0xF1..=0xFD => Entry::Int(((encoding & 0x0F) - 1) as i64),
                other => return Err(blob.corrupt(&format!("unknown entry encoding {:#04x}", other))),
            },
        };
        entries.push(entry);
    }

    Ok(entries)
}

const LISTPACK_END: u8 = 0xFF;

/// Decode a listpack (hashes, sets, sorted sets and quicklist nodes since Redis 7)
pub fn listpack_entries(data: &[u8]) -> Result<Vec<Entry<'_>>, DecodeError> {
    let mut blob = Blob::new(data, "listpack");
    // total bytes, element count
    blob.take(4)?;
    let declared = blob.u16_le()?;
    let mut entries = Vec::with_capacity(declared as usize);

    loop {
        let encoding = blob.u8()?;
        if encoding == LISTPACK_END {
            break;
        }

        // entry_len covers encoding byte(s) plus payload, used to skip the backlen
        let (entry, entry_len) = if encoding & 0x80 == 0 {
            (Entry::Int((encoding & 0x7F) as i64), 1)
        } else if encoding & 0xC0 == 0x80 {
            let len = (encoding & 0x3F) as usize;
            (Entry::Bytes(blob.take(len)?), 1 + len)
        } else if encoding & 0xE0 == 0xC0 {
            let raw = (((encoding & 0x1F) as i64) << 8) | blob.u8()? as i64;
            let value = if raw >= 1 << 12 { raw - (1 << 13) } else { raw };
            (Entry::Int(value), 2)
        } else if encoding & 0xF0 == 0xE0 {
            let len = (((encoding & 0x0F) as usize) << 8) | blob.u8()? as usize;
            (Entry::Bytes(blob.take(len)?), 2 + len)
        } else {
            match encoding {
                0xF0 => {
                    let len = blob.u32_le()? as usize;
                    (Entry::Bytes(blob.take(len)?), 5 + len)
                }
                0xF1 => (Entry::Int(blob.i16_le()?), 3),
                0xF2 => (Entry::Int(blob.i24_le()?), 4),
                0xF3 => (Entry::Int(blob.i32_le()?), 5),
                0xF4 => (Entry::Int(blob.i64_le()?), 9),
                other => return Err(blob.corrupt(&format!("unknown entry encoding {:#04x}", other))),
            }
        };

        blob.take(listpack_backlen_size(entry_len))?;
        entries.push(entry);
    }

    Ok(entries)
}

fn listpack_backlen_size(entry_len: usize) -> usize {
    match entry_len {
        0..=127 => 1,
        128..=16382 => 2,
        16383..=2097150 => 3,
        2097151..=268435454 => 4,
        _ => 5,
    }
}

/// Decode an intset (small all-integer sets)
pub fn intset_entries(data: &[u8]) -> Result<Vec<Entry<'_>>, DecodeError> {
    let mut blob = Blob::new(data, "intset");
    let width = blob.u32_le()?;
    let len = blob.u32_le()?;
    let mut entries = Vec::new();

    for _ in 0..len {
        let value = match width {
            2 => blob.i16_le()?,
            4 => blob.i32_le()?,
            8 => blob.i64_le()?,
            other => return Err(blob.corrupt(&format!("unsupported integer width {}", other))),
        };
        entries.push(Entry::Int(value));
    }

    Ok(entries)
}

const ZIPMAP_END: u8 = 0xFF;
const ZIPMAP_BIG_LEN: u8 = 0xFE;

/// Decode a zipmap (hashes in dumps older than Redis 2.6), fields and values alternating
pub fn zipmap_entries(data: &[u8]) -> Result<Vec<Entry<'_>>, DecodeError> {
    let mut blob = Blob::new(data, "zipmap");
    // element count hint, unreliable above 253
    blob.u8()?;
    let mut entries = Vec::new();

    loop {
        let first = blob.u8()?;
        if first == ZIPMAP_END {
            break;
        }
        let field_len = zipmap_len(&mut blob, first)?;
        entries.push(Entry::Bytes(blob.take(field_len)?));

        let first = blob.u8()?;
        let value_len = zipmap_len(&mut blob, first)?;
        let free = blob.u8()? as usize;
        entries.push(Entry::Bytes(blob.take(value_len)?));
        blob.take(free)?;
    }

    Ok(entries)
}

fn zipmap_len(blob: &mut Blob<'_>, first: u8) -> Result<usize, DecodeError> {
    match first {
        ZIPMAP_BIG_LEN => Ok(blob.u32_le()? as usize),
        ZIPMAP_END => Err(blob.corrupt("unexpected end marker")),
        len => Ok(len as usize),
    }
}

/// Decompress an LZF block to exactly `expected_len` bytes
pub fn lzf_decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    let out = lzf::decompress(input, expected_len)
        .map_err(|e| DecodeError::Corrupt(format!("lzf: {:?}", e)))?;

    if out.len() != expected_len {
        return Err(DecodeError::Corrupt(format!(
            "lzf: expected {} bytes, got {}",
            expected_len,
            out.len()
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_byte_len() {
        assert_eq!(Entry::Bytes(b"hello").byte_len(), 5);
        assert_eq!(Entry::Int(12345).byte_len(), 5);
        assert_eq!(Entry::Int(-7).byte_len(), 2);
    }

    #[test]
    fn test_ziplist_strings_and_ints() {
        let blob = [
            0x16, 0, 0, 0, // zlbytes
            0x10, 0, 0, 0, // zltail
            4, 0, // zllen
            0x00, 0x02, b'h', b'i', // "hi"
            0x04, 0xF3, // immediate 2
            0x02, 0xC0, 0x39, 0x30, // int16 12345
            0x04, 0xFE, 0xF9, // int8 -7
            0xFF,
        ];

        let entries = ziplist_entries(&blob).unwrap();
        assert_eq!(
            entries,
            vec![
                Entry::Bytes(b"hi"),
                Entry::Int(2),
                Entry::Int(12345),
                Entry::Int(-7)
            ]
        );
    }

    #[test]
    fn test_ziplist_int24() {
        let blob = [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0x00, 0xF0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(ziplist_entries(&blob).unwrap(), vec![Entry::Int(-1)]);
    }

    #[test]
    fn test_ziplist_missing_end_is_corrupt() {
        let blob = [0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0x00, 0x02, b'h', b'i'];
        assert!(matches!(ziplist_entries(&blob), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_listpack_entries() {
        let blob = [
            0, 0, 0, 0, // total bytes
            3, 0, // element count
            0x81, b'f', 0x02, // "f"
            0x07, 0x01, // 7
            0xDF, 0xFF, 0x02, // 13-bit -1
            0xFF,
        ];

        let entries = listpack_entries(&blob).unwrap();
        assert_eq!(
            entries,
            vec![Entry::Bytes(b"f"), Entry::Int(7), Entry::Int(-1)]
        );
    }

    #[test]
    fn test_listpack_backlen_size() {
        assert_eq!(listpack_backlen_size(1), 1);
        assert_eq!(listpack_backlen_size(127), 1);
        assert_eq!(listpack_backlen_size(128), 2);
        assert_eq!(listpack_backlen_size(16383), 3);
    }

    #[test]
    fn test_intset_entries() {
        let blob = [2, 0, 0, 0, 2, 0, 0, 0, 1, 0, 10, 0];
        assert_eq!(
            intset_entries(&blob).unwrap(),
            vec![Entry::Int(1), Entry::Int(10)]
        );
    }

    #[test]
    fn test_zipmap_entries() {
        let blob = [1, 1, b'k', 2, 0, b'v', b'v', 0xFF];
        assert_eq!(
            zipmap_entries(&blob).unwrap(),
            vec![Entry::Bytes(b"k"), Entry::Bytes(b"vv")]
        );
    }

    #[test]
    fn test_lzf_run() {
        let compressed = [0x00, b'a', 0xE0, 0x00, 0x00];
        assert_eq!(lzf_decompress(&compressed, 10).unwrap(), b"aaaaaaaaaa".to_vec());
    }

    #[test]
    fn test_lzf_length_mismatch() {
        let compressed = [0x01, b'a', b'b'];
        assert!(matches!(
            lzf_decompress(&compressed, 3),
            Err(DecodeError::Corrupt(_))
        ));
    }

    #[test]
    fn test_lzf_round_trip_with_crate_compressor() {
        let text = b"app:users:1 app:users:2 app:users:3 app:users:4".repeat(4);
        let compressed = lzf::compress(&text).unwrap();
        assert_eq!(lzf_decompress(&compressed, text.len()).unwrap(), text);
    }

    #[test]
    fn test_lzf_back_reference_before_start() {
        // back reference with nothing decoded yet
        let compressed = [0x20, 0x00];
        assert!(matches!(
            lzf_decompress(&compressed, 3),
            Err(DecodeError::Corrupt(_))
        ));
    }
}
