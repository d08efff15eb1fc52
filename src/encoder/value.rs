//! Encoder value path (Spec 7): typed representation, or the verbatim
//! source string through the datatype's restricted character set when
//! lexical preservation is on (Spec 7.2).

use crate::bitstream::BitWriter;
use crate::options::{Alignment, GrammarOptions};
use crate::schema::{SchemaCorpus, TypeId};
use crate::typed_value::{self, TypedValue, normalize_eol};
use crate::{Result, rcs, string};

/// Writes one AT/CH value. `typed` is the pre-parsed value when the typed
/// production was chosen; `None` with a `type_id` means lexical
/// preservation, `None` without one the plain string representation.
pub(super) fn encode_value(
    writer: &mut BitWriter,
    lexical: &str,
    typed: Option<TypedValue>,
    type_id: Option<TypeId>,
    corpus: &SchemaCorpus,
    options: GrammarOptions,
    alignment: Alignment,
) -> Result<()> {
    if options.has(GrammarOptions::PRESERVE_LEXICAL_VALUES) {
        // Spec 7.2: verbatim nach EOL-Normalisierung, durch das Restricted
        // Character Set des Datentyps.
        let normalized = normalize_eol(lexical);
        match type_id.map(|t| corpus.serial_of(t)).and_then(rcs::for_serial) {
            Some(set) => set.encode(writer, &normalized),
            None => string::encode(writer, &normalized),
        }
        return Ok(());
    }
    match typed {
        Some(value) => {
            let type_id = type_id.expect("typed value without its type");
            typed_value::encode_typed(writer, &value, type_id, corpus, alignment)
        }
        None => {
            string::encode(writer, lexical);
            Ok(())
        }
    }
}
