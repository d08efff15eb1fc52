//! EXI header encoding/decoding (Spec 5, 5.1, 5.2, 5.3).
//!
//! Header-Struktur:
//! - [EXI Cookie] (optional): `$EXI` als 4 ASCII-Bytes (Spec 5.1)
//! - Distinguishing Bits (required): `10` als 2 Bits (Spec 5.2)
//! - Presence Bit (required): 1 Bit, 1 = Options im Header (Spec 5)
//! - EXI Format Version (required): Preview-Bit + 4-Bit-Chunks (Spec 5.3)
//! - [Padding Bits]: bei byte-orientierten Alignments (Spec 5)
//!
//! Options travel out of band in this engine: the presence bit is always
//! written as 0 and a set presence bit is rejected on decode — both ends
//! share the same `CodecOptions`.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, n_bit_unsigned_integer};

/// EXI Cookie als ASCII-Bytes: "$EXI" (Spec 5.1).
pub const EXI_COOKIE: [u8; 4] = [0x24, 0x45, 0x58, 0x49];

/// Distinguishing Bits: `10` (Spec 5.2).
const DISTINGUISHING_BITS: u8 = 0b10;

/// Encodes the EXI header (Spec 5). `needs_padding` pads to a byte
/// boundary for the byte-oriented alignments.
pub fn encode(writer: &mut BitWriter, cookie: bool, needs_padding: bool) {
    if cookie {
        writer.write_bytes_aligned(&EXI_COOKIE);
    }
    writer.write_bits(u64::from(DISTINGUISHING_BITS), 2);
    // Presence Bit: Options nicht im Header (out of band)
    writer.write_bit(false);
    encode_version(writer, false, 1);
    if needs_padding {
        writer.align_to_byte();
    }
}

/// Encodes the format version (Spec 5.3): preview bit, then 4-bit chunks of
/// `version - 1` with 15 as the continuation marker.
fn encode_version(writer: &mut BitWriter, preview: bool, version: u16) {
    writer.write_bit(preview);
    let mut remaining = version - 1;
    loop {
        if remaining <= 14 {
            n_bit_unsigned_integer::encode(writer, u64::from(remaining), 4);
            break;
        }
        n_bit_unsigned_integer::encode(writer, 15, 4);
        remaining -= 15;
    }
}

/// Decodes and validates the EXI header (Spec 5); returns whether a cookie
/// was present.
///
/// # Errors
///
/// - [`Error::MalformedHeader`] bei einem angerissenen Cookie oder einem
///   gesetzten Options-Presence-Bit
/// - [`Error::InvalidDistinguishingBits`] wenn die Bits nicht `10` sind
/// - [`Error::UnsupportedVersion`] für Preview- oder Nicht-1-Versionen
pub fn decode(reader: &mut BitReader, needs_padding: bool) -> Result<bool> {
    let cookie = try_decode_cookie(reader)?;

    let dist_bits = n_bit_unsigned_integer::decode(reader, 2)? as u8;
    if dist_bits != DISTINGUISHING_BITS {
        return Err(Error::InvalidDistinguishingBits(dist_bits));
    }

    let options_present = reader.read_bit()?;
    if options_present {
        return Err(Error::MalformedHeader);
    }

    let (preview, version) = decode_version(reader)?;
    if preview || version != 1 {
        return Err(Error::UnsupportedVersion);
    }

    if needs_padding {
        reader.align_to_byte();
    }
    Ok(cookie)
}

/// Prüft auf den optionalen Cookie (Spec 5.1). Ein `$` ohne folgendes `EXI`
/// ist ein Fehler; andere erste Bytes gehören zum Header selbst.
fn try_decode_cookie(reader: &mut BitReader) -> Result<bool> {
    let probe = *reader;
    let mut look = *reader;
    let first = match look.read_byte_aligned() {
        Ok(b) => b,
        Err(_) => return Err(Error::PrematureEndOfStream),
    };
    if first != EXI_COOKIE[0] {
        *reader = probe;
        return Ok(false);
    }
    for &expected in &EXI_COOKIE[1..] {
        let byte = look.read_byte_aligned().map_err(|_| Error::MalformedHeader)?;
        if byte != expected {
            return Err(Error::MalformedHeader);
        }
    }
    *reader = look;
    Ok(true)
}

fn decode_version(reader: &mut BitReader) -> Result<(bool, u16)> {
    let preview = reader.read_bit()?;
    let mut version: u32 = 1;
    loop {
        let chunk = n_bit_unsigned_integer::decode(reader, 4)? as u32;
        version += chunk;
        if chunk != 15 {
            break;
        }
        if version > u16::MAX as u32 {
            return Err(Error::UnsupportedVersion);
        }
    }
    Ok((preview, version as u16))
}
