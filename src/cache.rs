//! Grammar cache (Spec 8.5): compiled grammars for one (corpus, options)
//! pair, built once and shared read-only by all encode/decode sessions.
//!
//! Construction is deterministic: identical inputs yield grammars that
//! encode byte-identical streams. The cache owns the corpus and the grammar
//! arena; both use owned strings and indices only, so a cache is `Send +
//! Sync` and can back concurrent sessions on separate threads.

use crate::grammar::{self, GrammarSet};
use crate::options::GrammarOptions;
use crate::schema::{SchemaBuilder, SchemaCorpus};
use crate::Result;

/// Compiled grammars plus their corpus and grammar options.
#[derive(Debug, Clone)]
pub struct GrammarCache {
    corpus: SchemaCorpus,
    options: GrammarOptions,
    set: GrammarSet,
}

impl GrammarCache {
    /// Compiles the grammars for a corpus under the given options
    /// (Spec 8.5.4). Schema inconsistencies surface here as
    /// [`crate::Error::GrammarBuild`], before any session starts.
    pub fn build(corpus: SchemaCorpus, options: GrammarOptions) -> Result<Self> {
        options.validate()?;
        let set = grammar::build(&corpus)?;
        Ok(Self { corpus, options, set })
    }

    /// A cache over the built-in types only (schema-less operation).
    pub fn schema_less(options: GrammarOptions) -> Result<Self> {
        Self::build(SchemaBuilder::new().build()?, options)
    }

    /// The schema corpus.
    pub fn corpus(&self) -> &SchemaCorpus {
        &self.corpus
    }

    /// The grammar options the cache was built with.
    pub fn options(&self) -> GrammarOptions {
        self.options
    }

    /// The compiled grammar arena.
    pub fn grammars(&self) -> &GrammarSet {
        &self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GrammarOptions;
    use crate::schema::DatatypeSerial;

    #[test]
    fn schema_less_cache() {
        let cache = GrammarCache::schema_less(GrammarOptions::DEFAULT).unwrap();
        assert!(cache.corpus().global_elements().is_empty());
        assert!(!cache.grammars().is_empty());
    }

    /// Spec 5.4: ungültige Options-Kombination schlägt beim Build fehl.
    #[test]
    fn ungueltige_optionen_beim_build() {
        let opts = GrammarOptions::STRICT | GrammarOptions::PRESERVE_COMMENTS;
        assert!(GrammarCache::schema_less(opts).is_err());
    }

    /// Der Cache ist über Threads teilbar (read-only Sharing).
    #[test]
    fn cache_ist_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GrammarCache>();
    }

    #[test]
    fn cache_teilt_corpus_und_grammars() {
        let mut b = SchemaBuilder::new();
        let t = b.builtin(DatatypeSerial::String);
        b.element("", "root", t);
        let cache = GrammarCache::build(b.build().unwrap(), GrammarOptions::STRICT).unwrap();
        assert!(cache.options().is_strict());
        assert_eq!(cache.corpus().global_elements().len(), 1);
    }

    /// Identische Inputs → identische Grammars (Round-Trip-Äquivalenz).
    #[test]
    fn deterministische_konstruktion() {
        let build_cache = || {
            let mut b = SchemaBuilder::new();
            let t = b.builtin(DatatypeSerial::Integer);
            b.element("urn:x", "n", t);
            GrammarCache::build(b.build().unwrap(), GrammarOptions::DEFAULT).unwrap()
        };
        let a = build_cache();
        let b = build_cache();
        assert_eq!(a.grammars().len(), b.grammars().len());
    }
}
