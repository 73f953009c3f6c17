//! Redis RDB dump decoder.
//!
//! Streams a dump once, front to back, and turns every stored key into two
//! events: `Observed` for the key, then `Grew` with the payload size of its
//! value. Payload size follows the usual auditing convention:
//!
//! - string: value length
//! - hash: field length + value length, summed over fields
//! - list / set / sorted set: element (member) length, summed
//!
//! Scores, expiry times, LRU/LFU metadata and checksums are read and ignored.
//! Modules and streams are not supported and abort the decode.

use super::encodings::{
    intset_entries, listpack_entries, lzf_decompress, ziplist_entries, zipmap_entries, Entry,
};
use super::events::{EventSink, KeyEvent};
use crate::utils::config::{MAX_RDB_VERSION, MIN_RDB_VERSION};
use crate::utils::error::DecodeError;
use log::{debug, info, warn};
use std::io::{ErrorKind, Read};

const MAGIC: &[u8; 5] = b"REDIS";

// Opcodes
const OPCODE_SLOT_INFO: u8 = 0xF4;
const OPCODE_FUNCTION2: u8 = 0xF5;
const OPCODE_FUNCTION_PRE_GA: u8 = 0xF6;
const OPCODE_MODULE_AUX: u8 = 0xF7;
const OPCODE_IDLE: u8 = 0xF8;
const OPCODE_FREQ: u8 = 0xF9;
const OPCODE_AUX: u8 = 0xFA;
const OPCODE_RESIZEDB: u8 = 0xFB;
const OPCODE_EXPIRETIME_MS: u8 = 0xFC;
const OPCODE_EXPIRETIME: u8 = 0xFD;
const OPCODE_SELECTDB: u8 = 0xFE;
const OPCODE_EOF: u8 = 0xFF;

// Value types
const TYPE_STRING: u8 = 0;
const TYPE_LIST: u8 = 1;
const TYPE_SET: u8 = 2;
const TYPE_ZSET: u8 = 3;
const TYPE_HASH: u8 = 4;
const TYPE_ZSET_2: u8 = 5;
const TYPE_HASH_ZIPMAP: u8 = 9;
const TYPE_LIST_ZIPLIST: u8 = 10;
const TYPE_SET_INTSET: u8 = 11;
const TYPE_ZSET_ZIPLIST: u8 = 12;
const TYPE_HASH_ZIPLIST: u8 = 13;
const TYPE_LIST_QUICKLIST: u8 = 14;
const TYPE_HASH_LISTPACK: u8 = 16;
const TYPE_ZSET_LISTPACK: u8 = 17;
const TYPE_LIST_QUICKLIST_2: u8 = 18;
const TYPE_SET_LISTPACK: u8 = 20;

// Special string encodings (length byte with the two high bits set)
const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;
const ENC_LZF: u8 = 3;

const QUICKLIST_NODE_PLAIN: u64 = 1;
const QUICKLIST_NODE_PACKED: u64 = 2;

/// What a decode run saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Dump format version from the header
    pub version: u32,

    /// Number of SELECTDB sections
    pub databases: u64,

    /// Number of keys delivered to the sink
    pub keys: u64,
}

/// Length prefix as stored in the dump
enum Length {
    Plain(u64),
    Encoded(u8),
}

/// Byte-level reader over a dump with typed helpers
struct RdbReader<R> {
    inner: R,
}

impl<R: Read> RdbReader<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| eof_or_io(e, what))?;
        Ok(buf)
    }

    fn read_u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(what)?[0])
    }

    fn read_bytes(&mut self, len: u64, what: &'static str) -> Result<Vec<u8>, DecodeError> {
        // Bounded by what the input actually holds, not by the declared length
        let mut buf = Vec::new();
        self.inner.by_ref().take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(DecodeError::UnexpectedEof(what));
        }
        Ok(buf)
    }

    fn skip(&mut self, len: u64, what: &'static str) -> Result<(), DecodeError> {
        let copied = std::io::copy(&mut self.inner.by_ref().take(len), &mut std::io::sink())?;
        if copied < len {
            return Err(DecodeError::UnexpectedEof(what));
        }
        Ok(())
    }

    fn read_length_or_encoding(&mut self, what: &'static str) -> Result<Length, DecodeError> {
        let first = self.read_u8(what)?;
        let length = match first >> 6 {
            0b00 => Length::Plain((first & 0x3F) as u64),
            0b01 => {
                let low = self.read_u8(what)? as u64;
                Length::Plain((((first & 0x3F) as u64) << 8) | low)
            }
            0b10 => match first {
                0x80 => Length::Plain(u32::from_be_bytes(self.read_array(what)?) as u64),
                0x81 => Length::Plain(u64::from_be_bytes(self.read_array(what)?)),
                other => {
                    return Err(DecodeError::Corrupt(format!(
                        "unknown length prefix {:#04x} for {}",
                        other, what
                    )))
                }
            },
            _ => Length::Encoded(first & 0x3F),
        };
        Ok(length)
    }

    fn read_length(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        match self.read_length_or_encoding(what)? {
            Length::Plain(len) => Ok(len),
            Length::Encoded(_) => Err(DecodeError::Corrupt(format!(
                "expected a length for {}, found a string encoding",
                what
            ))),
        }
    }

    fn read_string(&mut self, what: &'static str) -> Result<Vec<u8>, DecodeError> {
        match self.read_length_or_encoding(what)? {
            Length::Plain(len) => self.read_bytes(len, what),
            Length::Encoded(ENC_INT8) => {
                let value = self.read_u8(what)? as i8;
                Ok(value.to_string().into_bytes())
            }
            Length::Encoded(ENC_INT16) => {
                let value = i16::from_le_bytes(self.read_array(what)?);
                Ok(value.to_string().into_bytes())
            }
            Length::Encoded(ENC_INT32) => {
                let value = i32::from_le_bytes(self.read_array(what)?);
                Ok(value.to_string().into_bytes())
            }
            Length::Encoded(ENC_LZF) => {
                let compressed_len = self.read_length(what)?;
                let expected_len = self.read_length(what)?;
                let compressed = self.read_bytes(compressed_len, what)?;
                let expected_len = usize::try_from(expected_len).map_err(|_| {
                    DecodeError::Corrupt(format!("lzf length too large for {}", what))
                })?;
                lzf_decompress(&compressed, expected_len)
            }
            Length::Encoded(other) => Err(DecodeError::Corrupt(format!(
                "unknown string encoding {} for {}",
                other, what
            ))),
        }
    }

    /// Old-style sorted set score: one length byte then ASCII, with NaN/inf markers
    fn skip_string_double(&mut self) -> Result<(), DecodeError> {
        match self.read_u8("sorted set score")? {
            253..=255 => Ok(()),
            len => self.skip(len as u64, "sorted set score"),
        }
    }
}

fn eof_or_io(err: std::io::Error, what: &'static str) -> DecodeError {
    if err.kind() == ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof(what)
    } else {
        DecodeError::Io(err)
    }
}

/// Decode an RDB dump from `reader` into `sink`
///
/// **Public** - entry point for the `rdb` input format
///
/// # Arguments
/// * `reader` - Dump bytes, ideally buffered
/// * `sink` - Receives one `Observed` and one `Grew` event per key
///
/// # Errors
/// * `DecodeError::InvalidHeader` - Not an RDB dump
/// * `DecodeError::UnexpectedEof` - Dump is truncated
/// * `DecodeError::UnsupportedType` / `UnsupportedOpcode` - Modules, streams, functions
/// * `DecodeError::Corrupt` - Malformed length or packed encoding
pub fn decode<R, S>(reader: R, sink: &mut S) -> Result<DecodeSummary, DecodeError>
where
    R: Read,
    S: EventSink + ?Sized,
{
    let mut rdb = RdbReader::new(reader);
    let version = read_header(&mut rdb)?;
    info!("Decoding RDB dump (format version {})", version);

    let mut summary = DecodeSummary {
        version,
        ..Default::default()
    };

    loop {
        let opcode = rdb.read_u8("opcode")?;
        match opcode {
            OPCODE_EOF => break,
            OPCODE_SELECTDB => {
                let db = rdb.read_length("database number")?;
                debug!("Selecting database {}", db);
                summary.databases += 1;
            }
            OPCODE_RESIZEDB => {
                let keys = rdb.read_length("hash table size")?;
                let expires = rdb.read_length("expire table size")?;
                debug!("Database holds {} keys ({} with expiry)", keys, expires);
            }
            OPCODE_AUX => {
                let field = rdb.read_string("aux field")?;
                let value = rdb.read_string("aux value")?;
                debug!(
                    "Aux {} = {}",
                    String::from_utf8_lossy(&field),
                    String::from_utf8_lossy(&value)
                );
            }
            // Expiry and eviction metadata precede the value type of the next key
            OPCODE_EXPIRETIME => rdb.skip(4, "expire time")?,
            OPCODE_EXPIRETIME_MS => rdb.skip(8, "expire time")?,
            OPCODE_FREQ => rdb.skip(1, "lfu frequency")?,
            OPCODE_IDLE => {
                rdb.read_length("lru idle time")?;
            }
            OPCODE_FUNCTION2 => {
                let code = rdb.read_string("function library")?;
                debug!("Skipping function library ({} bytes)", code.len());
            }
            OPCODE_SLOT_INFO => {
                for what in ["slot id", "slot size", "expires slot size"] {
                    rdb.read_length(what)?;
                }
            }
            OPCODE_MODULE_AUX | OPCODE_FUNCTION_PRE_GA => {
                return Err(DecodeError::UnsupportedOpcode(opcode));
            }
            value_type => {
                let key = rdb.read_string("key")?;
                let key = key_to_string(key);
                let bytes = read_value_size(&mut rdb, value_type)?;

                sink.handle(KeyEvent::observed(key.clone()));
                sink.handle(KeyEvent::grew(key, bytes));
                summary.keys += 1;
            }
        }
    }

    info!(
        "Decoded {} keys across {} databases",
        summary.keys, summary.databases
    );
    Ok(summary)
}

/// Keys are binary-safe; bytes that are not UTF-8 are escaped (`\xff`) so
/// distinct keys stay distinct
fn key_to_string(raw: Vec<u8>) -> String {
    match String::from_utf8(raw) {
        Ok(key) => key,
        Err(err) => err.as_bytes().escape_ascii().to_string(),
    }
}

fn read_header<R: Read>(rdb: &mut RdbReader<R>) -> Result<u32, DecodeError> {
    let header: [u8; 9] = rdb.read_array("header")?;
    if &header[..5] != MAGIC {
        return Err(DecodeError::InvalidHeader(format!(
            "missing REDIS magic, found {:?}",
            String::from_utf8_lossy(&header[..5])
        )));
    }

    let version = std::str::from_utf8(&header[5..])
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| {
            DecodeError::InvalidHeader(format!(
                "bad version digits {:?}",
                String::from_utf8_lossy(&header[5..])
            ))
        })?;

    if version < MIN_RDB_VERSION {
        return Err(DecodeError::InvalidHeader(format!(
            "unsupported version {}",
            version
        )));
    }
    if version > MAX_RDB_VERSION {
        warn!(
            "RDB version {} is newer than {}, decoding may fail",
            version, MAX_RDB_VERSION
        );
    }

    Ok(version)
}

/// Read one value of `value_type` and return its payload size
fn read_value_size<R: Read>(rdb: &mut RdbReader<R>, value_type: u8) -> Result<u64, DecodeError> {
    let size = match value_type {
        TYPE_STRING => rdb.read_string("string value")?.len() as u64,
        TYPE_LIST | TYPE_SET => {
            let len = rdb.read_length("collection length")?;
            let mut total = 0u64;
            for _ in 0..len {
                total += rdb.read_string("collection element")?.len() as u64;
            }
            total
        }
        TYPE_ZSET | TYPE_ZSET_2 => {
            let len = rdb.read_length("sorted set length")?;
            let mut total = 0u64;
            for _ in 0..len {
                total += rdb.read_string("sorted set member")?.len() as u64;
                if value_type == TYPE_ZSET {
                    rdb.skip_string_double()?;
                } else {
                    rdb.skip(8, "sorted set score")?;
                }
            }
            total
        }
        TYPE_HASH => {
            let len = rdb.read_length("hash length")?;
            let mut total = 0u64;
            for _ in 0..len {
                total += rdb.read_string("hash field")?.len() as u64;
                total += rdb.read_string("hash value")?.len() as u64;
            }
            total
        }
        TYPE_HASH_ZIPMAP => packed_size(&rdb.read_string("zipmap")?, zipmap_entries, Stride::All)?,
        TYPE_LIST_ZIPLIST | TYPE_HASH_ZIPLIST => {
            packed_size(&rdb.read_string("ziplist")?, ziplist_entries, Stride::All)?
        }
        TYPE_ZSET_ZIPLIST => {
            packed_size(&rdb.read_string("ziplist")?, ziplist_entries, Stride::Members)?
        }
        TYPE_SET_INTSET => packed_size(&rdb.read_string("intset")?, intset_entries, Stride::All)?,
        TYPE_HASH_LISTPACK | TYPE_SET_LISTPACK => {
            packed_size(&rdb.read_string("listpack")?, listpack_entries, Stride::All)?
        }
        TYPE_ZSET_LISTPACK => {
            packed_size(&rdb.read_string("listpack")?, listpack_entries, Stride::Members)?
        }
        TYPE_LIST_QUICKLIST => {
            let nodes = rdb.read_length("quicklist length")?;
            let mut total = 0u64;
            for _ in 0..nodes {
                total += packed_size(&rdb.read_string("quicklist node")?, ziplist_entries, Stride::All)?;
            }
            total
        }
        TYPE_LIST_QUICKLIST_2 => {
            let nodes = rdb.read_length("quicklist length")?;
            let mut total = 0u64;
            for _ in 0..nodes {
                let container = rdb.read_length("quicklist container")?;
                let node = rdb.read_string("quicklist node")?;
                total += match container {
                    QUICKLIST_NODE_PLAIN => node.len() as u64,
                    QUICKLIST_NODE_PACKED => packed_size(&node, listpack_entries, Stride::All)?,
                    other => {
                        return Err(DecodeError::Corrupt(format!(
                            "unknown quicklist container {}",
                            other
                        )))
                    }
                };
            }
            total
        }
        other => return Err(DecodeError::UnsupportedType(other)),
    };

    Ok(size)
}

/// Which elements of a packed blob count towards the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stride {
    All,
    /// Sorted sets alternate member and score; only members count
    Members,
}

fn packed_size<'a, F>(blob: &'a [u8], entries: F, stride: Stride) -> Result<u64, DecodeError>
where
    F: Fn(&'a [u8]) -> Result<Vec<Entry<'a>>, DecodeError>,
{
    let entries = entries(blob)?;
    let step = match stride {
        Stride::All => 1,
        Stride::Members => 2,
    };
    Ok(entries.iter().step_by(step).map(Entry::byte_len).sum())
}
