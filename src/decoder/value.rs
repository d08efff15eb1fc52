//! Decoder value path (Spec 7): typed representation rendered to its
//! canonical lexical form, or the verbatim preserved string under lexical
//! preservation (Spec 7.2).

use std::rc::Rc;

use crate::bitstream::BitReader;
use crate::options::{Alignment, GrammarOptions};
use crate::schema::{SchemaCorpus, TypeId};
use crate::typed_value;
use crate::{Result, rcs, string};

/// Reads one AT/CH value and renders its lexical form. Mirrors the
/// encoder's value path exactly.
pub(super) fn decode_value(
    reader: &mut BitReader<'_>,
    type_id: Option<TypeId>,
    corpus: &SchemaCorpus,
    options: GrammarOptions,
    alignment: Alignment,
) -> Result<Rc<str>> {
    if options.has(GrammarOptions::PRESERVE_LEXICAL_VALUES) {
        let verbatim = match type_id.map(|t| corpus.serial_of(t)).and_then(rcs::for_serial) {
            Some(set) => set.decode(reader)?,
            None => string::decode(reader)?,
        };
        return Ok(Rc::from(verbatim));
    }
    match type_id {
        Some(t) => {
            let value = typed_value::decode_typed(reader, t, corpus, alignment)?;
            Ok(Rc::from(value.canonical_lexical()))
        }
        None => Ok(Rc::from(string::decode(reader)?)),
    }
}
