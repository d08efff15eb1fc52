//! Multi-part event code representation (Spec 6.1, 6.2, 8.2).
//!
//! Each entry of an [`EventTypeList`] is addressed by an event code of 1–3
//! parts, one per depth level. Depth-1 entries occupy the first-level code
//! space directly; one extra "escape" value leads to the depth-2 group, and
//! another from there to depth 3. Part widths derive from the number of
//! distinct values at each level: `n = ⌈log₂(m)⌉` (Spec 6.2), written as
//! n-bit unsigned integers (bit-packed) or their ⌈n/8⌉-octet form
//! (byte-oriented alignments).

use crate::bitstream::{BitReader, BitWriter};
use crate::event::{EventType, EventTypeList};
use crate::integer::ceiling_log2;
use crate::options::Alignment;
use crate::{Error, Result, n_bit_unsigned_integer};

/// A materialised event code, for diagnostics (Spec 6.1 "1.2.0" notation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCode {
    parts: Vec<u64>,
}

impl EventCode {
    /// The parts, outermost first.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for p in &self.parts {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{p}")?;
            first = false;
        }
        Ok(())
    }
}

/// Anzahl distinct values je Teil: Tiefe-1-Einträge plus Escape wenn tiefere
/// Gruppen existieren (Spec 6.2).
fn distinct_values(list: &EventTypeList) -> [u64; 3] {
    let n1 = list.depth_count(1) as u64;
    let n2 = list.depth_count(2) as u64;
    let n3 = list.depth_count(3) as u64;
    [
        n1 + u64::from(n2 + n3 > 0),
        n2 + u64::from(n3 > 0),
        n3,
    ]
}

/// The event code of an entry within its list (Spec 6.1).
pub fn code_of(list: &EventTypeList, event: &EventType) -> EventCode {
    let [d1, d2, _] = distinct_values(list);
    let pos = list.position_in_depth(event.index) as u64;
    let parts = match event.depth {
        1 => vec![pos],
        2 => vec![d1 - 1, pos],
        _ => vec![d1 - 1, d2 - 1, pos],
    };
    EventCode { parts }
}

fn write_part(writer: &mut BitWriter, value: u64, distinct: u64, alignment: Alignment) {
    let bits = ceiling_log2(distinct);
    if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::encode_aligned(writer, value, bits);
    } else {
        n_bit_unsigned_integer::encode(writer, value, bits);
    }
}

fn read_part(reader: &mut BitReader, distinct: u64, alignment: Alignment) -> Result<u64> {
    let bits = ceiling_log2(distinct);
    if alignment.is_byte_oriented() {
        n_bit_unsigned_integer::decode_aligned(reader, bits)
    } else {
        n_bit_unsigned_integer::decode(reader, bits)
    }
}

/// Writes the event code of `event` against its list (Spec 6.2).
pub fn encode(
    writer: &mut BitWriter,
    list: &EventTypeList,
    event: &EventType,
    alignment: Alignment,
) {
    let [d1, d2, d3] = distinct_values(list);
    let pos = list.position_in_depth(event.index) as u64;
    match event.depth {
        1 => write_part(writer, pos, d1, alignment),
        2 => {
            write_part(writer, d1 - 1, d1, alignment);
            write_part(writer, pos, d2, alignment);
        }
        _ => {
            write_part(writer, d1 - 1, d1, alignment);
            write_part(writer, d2 - 1, d2, alignment);
            write_part(writer, pos, d3, alignment);
        }
    }
}

/// Reads the next event code against the current list and resolves it to an
/// entry (Spec 6.2). A code outside the valid range for the state is a
/// fatal [`Error::InvalidEventCode`].
pub fn decode<'a>(
    reader: &mut BitReader,
    list: &'a EventTypeList,
    alignment: Alignment,
    state_name: &'static str,
) -> Result<&'a EventType> {
    let [d1, d2, d3] = distinct_values(list);
    if d1 == 0 {
        return Err(Error::invalid_event_code("", state_name));
    }

    let p1 = read_part(reader, d1, alignment)?;
    if p1 < list.depth_count(1) as u64 {
        return list
            .at_depth_position(1, p1 as usize)
            .ok_or_else(|| Error::invalid_event_code(p1.to_string(), state_name));
    }
    if p1 >= d1 {
        return Err(Error::invalid_event_code(p1.to_string(), state_name));
    }

    let p2 = read_part(reader, d2, alignment)?;
    if p2 < list.depth_count(2) as u64 {
        return list
            .at_depth_position(2, p2 as usize)
            .ok_or_else(|| Error::invalid_event_code(format!("{p1}.{p2}"), state_name));
    }
    if p2 >= d2 {
        return Err(Error::invalid_event_code(format!("{p1}.{p2}"), state_name));
    }

    let p3 = read_part(reader, d3, alignment)?;
    list.at_depth_position(3, p3 as usize)
        .ok_or_else(|| Error::invalid_event_code(format!("{p1}.{p2}.{p3}"), state_name))
}
