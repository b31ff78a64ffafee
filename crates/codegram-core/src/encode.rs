//! Payload encoders used to embed diagram markup into third-party URLs.
//!
//! - [`encode`] produces the PlantUML server payload: zlib at maximum compression, framing
//!   stripped to a raw deflate stream, then packed 3 bytes → 4 symbols over the alphabet
//!   `0-9A-Za-z-_`.
//! - [`encode_uri_component`] percent-encodes text the way browsers' `encodeURIComponent`
//!   does; the draw.io viewer expects its `#R` fragment in that form.

use crate::error::{Error, Result};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::io::Write;

/// zlib header (CMF + FLG).
const ZLIB_HEADER_LEN: usize = 2;
/// zlib trailer (Adler-32).
const ZLIB_TRAILER_LEN: usize = 4;

/// Characters `encodeURIComponent` leaves untouched besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encodes diagram text into a PlantUML URL payload.
///
/// Total over UTF-8 input; the only failure is the compressor itself failing
/// ([`Error::EncoderUnavailable`]). The empty string encodes to `"0m00"`.
pub fn encode(text: &str) -> Result<String> {
    let deflated = compress(text)?;
    Ok(encode_bytes(&deflated))
}

/// Returns the raw deflate stream that [`encode`] packs: zlib output at maximum
/// compression with the 2-byte header and 4-byte checksum removed.
pub fn compress(text: &str) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(text.as_bytes())
        .map_err(|err| Error::EncoderUnavailable {
            message: err.to_string(),
        })?;
    let wrapped = encoder.finish().map_err(|err| Error::EncoderUnavailable {
        message: err.to_string(),
    })?;

    if wrapped.len() < ZLIB_HEADER_LEN + ZLIB_TRAILER_LEN {
        return Err(Error::EncoderUnavailable {
            message: format!("compressor produced {} bytes", wrapped.len()),
        });
    }
    Ok(wrapped[ZLIB_HEADER_LEN..wrapped.len() - ZLIB_TRAILER_LEN].to_vec())
}

/// Packs bytes into the PlantUML 6-bit alphabet, 4 symbols per (zero-padded) 3-byte group.
pub fn encode_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        append_3_bytes(&mut out, b1, b2, b3);
    }
    out
}

fn append_3_bytes(out: &mut String, b1: u8, b2: u8, b3: u8) {
    let c1 = b1 >> 2;
    let c2 = ((b1 & 0x3) << 4) | (b2 >> 4);
    let c3 = ((b2 & 0xF) << 2) | (b3 >> 6);
    let c4 = b3 & 0x3F;
    for c in [c1, c2, c3, c4] {
        out.push(encode_6bit(c & 0x3F));
    }
}

fn encode_6bit(b: u8) -> char {
    match b {
        0..=9 => (b'0' + b) as char,
        10..=35 => (b'A' + (b - 10)) as char,
        36..=61 => (b'a' + (b - 36)) as char,
        62 => '-',
        // Callers mask to 6 bits, so this arm is 63.
        _ => '_',
    }
}

/// Percent-encodes every byte except `A-Za-z0-9-_.!~*'()`, matching `encodeURIComponent`.
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}
