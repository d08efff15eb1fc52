//! String table: URI and local-name partitions with compact ids (Spec 7.3).
//!
//! Wildcard SE/AT events and xsi:type payloads carry qnames on the wire.
//! Each partition assigns compact ids to known strings: a URI hit encodes
//! as `id + 1` in ⌈log₂(count+1)⌉ bits (0 = miss, followed by the literal);
//! a local-name hit encodes as a zero length prefix plus the id in
//! ⌈log₂(count)⌉ bits, a miss as `length + 1` plus the code points
//! (Spec 7.3.1, 7.3.2). Misses grow the partition on both sides
//! symmetrically, so ids stay in sync without negotiation.
//!
//! Partitions are pre-populated with the empty URI, the xml/xsi/xsd
//! namespaces and their initial name entries, plus the corpus's URIs and
//! sorted local names (Spec D.1–D.3).

use crate::bitstream::{BitReader, BitWriter};
use crate::integer::ceiling_log2;
use crate::options::Alignment;
use crate::qname::{QName, URI_XML, URI_XSD, URI_XSI};
use crate::schema::{DatatypeSerial, SchemaCorpus};
use crate::{FastHashMap, Result, n_bit_unsigned_integer, string, unsigned_integer};

/// Fixed initial entries of the xml namespace (Spec D.2).
const XML_NAMES: &[&str] = &["base", "id", "lang", "space"];
/// Fixed initial entries of the xsi namespace (Spec D.2).
const XSI_NAMES: &[&str] = &["nil", "type"];

/// One string partition: insertion-ordered entries with id lookup.
#[derive(Debug, Clone, Default)]
struct Partition {
    entries: Vec<String>,
    ids: FastHashMap<Box<str>, usize>,
}

impl Partition {
    fn add(&mut self, value: &str) -> usize {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push(value.to_string());
        self.ids.insert(Box::from(value), id);
        id
    }

    fn get(&self, value: &str) -> Option<usize> {
        self.ids.get(value).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Session-local string table (mutable; encoder and decoder mutate in
/// lockstep).
#[derive(Debug, Clone)]
pub struct StringTable {
    uris: Partition,
    /// Local-name partition per URI id.
    local_names: Vec<Partition>,
    alignment: Alignment,
}

impl StringTable {
    /// Builds the table with its initial entries for a corpus (Spec D.1–D.3).
    pub fn new(corpus: &SchemaCorpus, alignment: Alignment) -> Self {
        let mut table = Self {
            uris: Partition::default(),
            local_names: Vec::new(),
            alignment,
        };
        table.add_uri_with_names("", &[]);
        table.add_uri_with_names(URI_XML, XML_NAMES);
        table.add_uri_with_names(URI_XSI, XSI_NAMES);
        let mut xsd_names: Vec<&str> = Vec::new();
        for serial in [
            DatatypeSerial::AnySimpleType,
            DatatypeSerial::String,
            DatatypeSerial::Boolean,
            DatatypeSerial::Decimal,
            DatatypeSerial::Float,
            DatatypeSerial::Double,
            DatatypeSerial::Integer,
            DatatypeSerial::NonNegativeInteger,
            DatatypeSerial::Long,
            DatatypeSerial::Int,
            DatatypeSerial::DateTime,
            DatatypeSerial::Date,
            DatatypeSerial::Time,
            DatatypeSerial::GYear,
            DatatypeSerial::GYearMonth,
            DatatypeSerial::GMonth,
            DatatypeSerial::GMonthDay,
            DatatypeSerial::GDay,
            DatatypeSerial::Base64Binary,
            DatatypeSerial::HexBinary,
            DatatypeSerial::AnyUri,
            DatatypeSerial::QName,
        ] {
            xsd_names.push(serial.local_name());
        }
        xsd_names.sort_unstable();
        table.add_uri_with_names(URI_XSD, &xsd_names);

        for uri in corpus.uris() {
            let names = corpus.local_names_of(uri);
            table.add_uri_with_names(uri, &names);
        }
        table
    }

    fn add_uri_with_names(&mut self, uri: &str, names: &[&str]) {
        let id = self.uris.add(uri);
        if id == self.local_names.len() {
            self.local_names.push(Partition::default());
        }
        for name in names {
            self.local_names[id].add(name);
        }
    }

    fn write_id(&self, writer: &mut BitWriter, value: u64, bits: u8) {
        if self.alignment.is_byte_oriented() {
            n_bit_unsigned_integer::encode_aligned(writer, value, bits);
        } else {
            n_bit_unsigned_integer::encode(writer, value, bits);
        }
    }

    fn read_id(&self, reader: &mut BitReader, bits: u8) -> Result<u64> {
        if self.alignment.is_byte_oriented() {
            n_bit_unsigned_integer::decode_aligned(reader, bits)
        } else {
            n_bit_unsigned_integer::decode(reader, bits)
        }
    }

    /// Encodes a URI: compact id + 1 on hit, 0 + literal on miss
    /// (Spec 7.3.1).
    pub fn encode_uri(&mut self, writer: &mut BitWriter, uri: &str) -> usize {
        let bits = ceiling_log2(self.uris.len() as u64 + 1);
        match self.uris.get(uri) {
            Some(id) => {
                self.write_id(writer, id as u64 + 1, bits);
                id
            }
            None => {
                self.write_id(writer, 0, bits);
                string::encode(writer, uri);
                let id = self.uris.add(uri);
                self.local_names.push(Partition::default());
                id
            }
        }
    }

    /// Decodes a URI (Spec 7.3.1). Returns (uri id, uri).
    pub fn decode_uri(&mut self, reader: &mut BitReader) -> Result<(usize, String)> {
        let bits = ceiling_log2(self.uris.len() as u64 + 1);
        let code = self.read_id(reader, bits)?;
        if code == 0 {
            let uri = string::decode(reader)?;
            let id = self.uris.add(&uri);
            self.local_names.push(Partition::default());
            Ok((id, uri))
        } else {
            let id = (code - 1) as usize;
            let uri = self
                .uris
                .entries
                .get(id)
                .cloned()
                .ok_or(crate::Error::PrematureEndOfStream)?;
            Ok((id, uri))
        }
    }

    /// Encodes a local name within a URI partition: zero length prefix +
    /// compact id on hit, `length + 1` + code points on miss (Spec 7.3.2).
    pub fn encode_local_name(&mut self, writer: &mut BitWriter, uri_id: usize, name: &str) {
        match self.local_names[uri_id].get(name) {
            Some(id) => {
                unsigned_integer::encode(writer, 0);
                let bits = ceiling_log2(self.local_names[uri_id].len() as u64);
                self.write_id(writer, id as u64, bits);
            }
            None => {
                unsigned_integer::encode(writer, name.chars().count() as u64 + 1);
                for ch in name.chars() {
                    unsigned_integer::encode(writer, ch as u64);
                }
                self.local_names[uri_id].add(name);
            }
        }
    }

    /// Decodes a local name within a URI partition (Spec 7.3.2).
    pub fn decode_local_name(&mut self, reader: &mut BitReader, uri_id: usize) -> Result<String> {
        let prefix = unsigned_integer::decode(reader)?;
        if prefix == 0 {
            let bits = ceiling_log2(self.local_names[uri_id].len() as u64);
            let id = self.read_id(reader, bits)? as usize;
            self.local_names[uri_id]
                .entries
                .get(id)
                .cloned()
                .ok_or(crate::Error::PrematureEndOfStream)
        } else {
            let len = (prefix - 1) as usize;
            let mut name = String::with_capacity(len);
            for _ in 0..len {
                let cp = unsigned_integer::decode(reader)?;
                let ch = u32::try_from(cp)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(crate::Error::InvalidCodePoint(cp))?;
                name.push(ch);
            }
            self.local_names[uri_id].add(&name);
            Ok(name)
        }
    }

    /// Encodes a qname: URI partition, then that URI's local-name partition
    /// (Spec 7.1.7).
    pub fn encode_qname(&mut self, writer: &mut BitWriter, qname: &QName) {
        let uri_id = self.encode_uri(writer, &qname.uri);
        self.encode_local_name(writer, uri_id, &qname.local_name);
    }

    /// Decodes a qname (Spec 7.1.7).
    pub fn decode_qname(&mut self, reader: &mut BitReader) -> Result<QName> {
        let (uri_id, uri) = self.decode_uri(reader)?;
        let local = self.decode_local_name(reader, uri_id)?;
        Ok(QName::new(&uri, &local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn table() -> StringTable {
        let corpus = SchemaBuilder::new().build().unwrap();
        StringTable::new(&corpus, Alignment::BitPacked)
    }

    fn qname_round_trip(enc: &mut StringTable, dec: &mut StringTable, q: &QName) -> QName {
        let mut w = BitWriter::new();
        enc.encode_qname(&mut w, q);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        dec.decode_qname(&mut r).unwrap()
    }

    /// Spec D.1/D.2: xml/xsi/xsd-Einträge vorbesetzt.
    #[test]
    fn vorbesetzte_partitionen() {
        let t = table();
        assert_eq!(t.uris.get(""), Some(0));
        assert_eq!(t.uris.get(URI_XML), Some(1));
        assert_eq!(t.uris.get(URI_XSI), Some(2));
        assert_eq!(t.uris.get(URI_XSD), Some(3));
        assert!(t.local_names[2].get("nil").is_some());
        assert!(t.local_names[2].get("type").is_some());
        assert!(t.local_names[3].get("integer").is_some());
    }

    /// Hit: kompakte Id; Tabellen bleiben synchron.
    #[test]
    fn hit_kompakt() {
        let mut enc = table();
        let mut dec = table();
        let q = QName::new(URI_XSI, "type");
        assert_eq!(qname_round_trip(&mut enc, &mut dec, &q), q);
    }

    /// Miss: Literal + Wachstum; zweites Vorkommen ist ein Hit.
    #[test]
    fn miss_dann_hit() {
        let mut enc = table();
        let mut dec = table();
        let q = QName::new("urn:neu", "fresh");

        let mut w = BitWriter::new();
        enc.encode_qname(&mut w, &q);
        let first_len = w.bit_position();
        enc.encode_qname(&mut w, &q);
        let second_len = w.bit_position() - first_len;
        assert!(second_len < first_len, "hit must be more compact than miss");

        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(dec.decode_qname(&mut r).unwrap(), q);
        assert_eq!(dec.decode_qname(&mut r).unwrap(), q);
    }

    /// Corpus-URIs und Namen sind vorbesetzt.
    #[test]
    fn corpus_seeds() {
        let mut b = SchemaBuilder::new();
        let s = b.builtin(DatatypeSerial::String);
        b.element("urn:app", "order", s);
        let corpus = b.build().unwrap();
        let t = StringTable::new(&corpus, Alignment::BitPacked);
        let uri_id = t.uris.get("urn:app").unwrap();
        assert!(t.local_names[uri_id].get("order").is_some());
    }

    #[test]
    fn lokalname_in_leerer_partition() {
        let mut enc = table();
        let mut dec = table();
        // Leere URI-Partition (id 0) hat keine Namen: erster Name ist ein Miss
        let q = QName::new("", "root");
        assert_eq!(qname_round_trip(&mut enc, &mut dec, &q), q);
    }

    #[test]
    fn unbekannte_kompakt_id_abgelehnt() {
        let mut dec = table();
        // URI-Code 5 bei 4 Einträgen (Bits = 3): Id 4 existiert nicht
        let mut w = BitWriter::new();
        n_bit_unsigned_integer::encode(&mut w, 5, 3);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert!(dec.decode_uri(&mut r).is_err());
    }
}
