//! Channel partitioning for the preCompress/compress alignments (Spec 9).
//!
//! The channelled modes buffer the whole document before emitting: event
//! codes and structural content go to the *structure channel*, AT/CH values
//! to one *value channel* per qname, in order of first appearance
//! (Spec 9.1). On emit, each channel becomes a length-prefixed block —
//! verbatim for preCompress (Spec 9.2), an RFC 1951 DEFLATE stream for
//! compress (Spec 9.3). The decoder reads the structure channel first; the
//! value-channel order and per-channel counts fall out of the structure
//! pass, so no channel directory is needed.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::FastIndexMap;
use crate::bitstream::{BitReader, BitWriter};
use crate::qname::QName;
use crate::{Error, Result, unsigned_integer};

/// Channel identity: (uri, local-name) of the AT/CH carrier (Spec 9.1).
pub(crate) type ChannelKey = (Box<str>, Box<str>);

/// Kanal-Schlüssel eines QName.
pub(crate) fn channel_key(qname: &QName) -> ChannelKey {
    (Box::from(&*qname.uri), Box::from(&*qname.local_name))
}

/// Encoder-side channel buffers, held for the session lifetime (Spec 9.1).
pub(crate) struct ChannelSet {
    pub(crate) structure: BitWriter,
    channels: FastIndexMap<ChannelKey, BitWriter>,
}

impl ChannelSet {
    pub(crate) fn new() -> Self {
        Self { structure: BitWriter::new(), channels: FastIndexMap::default() }
    }

    /// The value channel for a qname, created on first use (first-appearance
    /// order is the emit order, Spec 9.1).
    pub(crate) fn channel(&mut self, qname: &QName) -> &mut BitWriter {
        self.channels.entry(channel_key(qname)).or_default()
    }

    /// Emits all channels as length-prefixed blocks (Spec 9.2, 9.3).
    pub(crate) fn emit(self, out: &mut BitWriter, deflate: bool) -> Result<()> {
        log::trace!("emitting {} value channels", self.channels.len());
        write_block(out, self.structure.into_vec(), deflate)?;
        for (_, channel) in self.channels {
            write_block(out, channel.into_vec(), deflate)?;
        }
        Ok(())
    }
}

fn write_block(out: &mut BitWriter, data: Vec<u8>, deflate: bool) -> Result<()> {
    let payload = if deflate { deflate_block(&data)? } else { data };
    unsigned_integer::encode(out, payload.len() as u64);
    out.write_bytes_aligned(&payload);
    Ok(())
}

/// Reads one length-prefixed channel block (Spec 9.2, 9.3).
pub(crate) fn read_block(reader: &mut BitReader, deflate: bool) -> Result<Vec<u8>> {
    let len = unsigned_integer::decode(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::PrematureEndOfStream)?;
    let payload = reader.read_bytes_aligned(len)?;
    if deflate {
        inflate_block(&payload)
    } else {
        Ok(payload)
    }
}

/// RFC 1951 DEFLATE (Spec 9.3).
pub(crate) fn deflate_block(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::CompressionError(e.to_string()))
}

/// RFC 1951 INFLATE (Spec 9.3).
pub(crate) fn inflate_block(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionError(e.to_string()))?;
    Ok(out)
}
