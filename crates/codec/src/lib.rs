//! Ordex Codec - Order-preserving binary encoding for composite keys.
//!
//! Encodes a `Key` into a byte sequence whose unsigned lexicographic order
//! matches the key order defined in `ordex-core`, and decodes the inverse.
//! The encoding is deterministic and injective: unequal keys encode to
//! unequal bytes, equal keys encode identically.
//!
//! ## Encoding Format
//!
//! Each component is encoded as: `[type_tag: u8] [data...]`
//!
//! Type tags (tag order realizes the type-rank order):
//! - 0x42: number — 8 bytes big-endian, sign-transformed so byte order is numeric order
//! - 0x70: text — escaped UTF-8 bytes, 0x00 terminator
//! - 0xA0: tuple — encoded elements, 0x00 terminator
//! - 0xFF: maximum sentinel
//!
//! The terminator byte sorts below every tag, which is what gives a shorter
//! tuple its place immediately before any tuple extending it (prefix order).
//! Text content escapes `0x00 -> 0x01 0x01` and `0x01 -> 0x01 0x02` so the
//! terminator stays unambiguous without disturbing relative order.

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use ordex_core::{Error, Key, Result};

const TAG_NUMBER: u8 = 0x42;
const TAG_TEXT: u8 = 0x70;
const TAG_TUPLE: u8 = 0xA0;
const TAG_MAX: u8 = 0xFF;

const TERMINATOR: u8 = 0x00;
const ESCAPE: u8 = 0x01;

/// Encodes a concrete key. Fails with `InvalidKey` on empty or sentinel keys.
pub fn encode(key: &Key) -> Result<Vec<u8>> {
    key.validate()?;
    let mut out = Vec::new();
    encode_component(key, &mut out);
    Ok(out)
}

/// Encodes a range bound, admitting the `Max` sentinel.
pub fn encode_bound(key: &Key) -> Result<Vec<u8>> {
    key.validate_bound()?;
    let mut out = Vec::new();
    encode_component(key, &mut out);
    Ok(out)
}

/// Decodes a key previously produced by `encode` or `encode_bound`.
pub fn decode(data: &[u8]) -> Result<Key> {
    let mut pos = 0;
    let key = decode_component(data, &mut pos)?;
    if pos != data.len() {
        return Err(Error::invalid_key("trailing bytes after encoded key"));
    }
    Ok(key)
}

/// Maps f64 bits to u64 so unsigned comparison matches `total_cmp` order:
/// negatives are fully complemented, positives get the sign bit flipped.
fn number_to_ordered_bits(n: f64) -> u64 {
    let bits = n.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

fn ordered_bits_to_number(bits: u64) -> f64 {
    let raw = if bits >> 63 == 0 {
        !bits
    } else {
        bits ^ (1 << 63)
    };
    f64::from_bits(raw)
}

fn encode_component(key: &Key, out: &mut Vec<u8>) {
    match key {
        Key::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&number_to_ordered_bits(*n).to_be_bytes());
        }
        Key::Text(s) => {
            out.push(TAG_TEXT);
            for &b in s.as_bytes() {
                match b {
                    TERMINATOR => out.extend_from_slice(&[ESCAPE, 0x01]),
                    ESCAPE => out.extend_from_slice(&[ESCAPE, 0x02]),
                    _ => out.push(b),
                }
            }
            out.push(TERMINATOR);
        }
        Key::Tuple(parts) => {
            out.push(TAG_TUPLE);
            for part in parts {
                encode_component(part, out);
            }
            out.push(TERMINATOR);
        }
        Key::Max => {
            out.push(TAG_MAX);
        }
    }
}

fn decode_component(data: &[u8], pos: &mut usize) -> Result<Key> {
    let tag = *data
        .get(*pos)
        .ok_or_else(|| Error::invalid_key("truncated encoded key"))?;
    *pos += 1;
    match tag {
        TAG_NUMBER => {
            let end = *pos + 8;
            let bytes = data
                .get(*pos..end)
                .ok_or_else(|| Error::invalid_key("truncated number component"))?;
            *pos = end;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(Key::Number(ordered_bits_to_number(u64::from_be_bytes(buf))))
        }
        TAG_TEXT => {
            let mut bytes = Vec::new();
            loop {
                let b = *data
                    .get(*pos)
                    .ok_or_else(|| Error::invalid_key("unterminated text component"))?;
                *pos += 1;
                match b {
                    TERMINATOR => break,
                    ESCAPE => {
                        let esc = *data
                            .get(*pos)
                            .ok_or_else(|| Error::invalid_key("truncated escape sequence"))?;
                        *pos += 1;
                        match esc {
                            0x01 => bytes.push(TERMINATOR),
                            0x02 => bytes.push(ESCAPE),
                            _ => return Err(Error::invalid_key("unknown escape sequence")),
                        }
                    }
                    _ => bytes.push(b),
                }
            }
            let s = String::from_utf8(bytes)
                .map_err(|_| Error::invalid_key("non-UTF-8 text component"))?;
            Ok(Key::Text(s))
        }
        TAG_TUPLE => {
            let mut parts = Vec::new();
            loop {
                let b = *data
                    .get(*pos)
                    .ok_or_else(|| Error::invalid_key("unterminated tuple component"))?;
                if b == TERMINATOR {
                    *pos += 1;
                    break;
                }
                parts.push(decode_component(data, pos)?);
            }
            Ok(Key::Tuple(parts))
        }
        TAG_MAX => Ok(Key::Max),
        _ => Err(Error::invalid_key("unknown component tag")),
    }
}
