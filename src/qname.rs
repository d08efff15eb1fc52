//! Qualified names (Spec 7.1.7).
//!
//! A QName is the pair (namespace URI, local name) plus an optional prefix.
//! Spec 7.1.7: "Two qnames are considered equal if they have the same uri
//! and local-name, regardless of their prefix values." — equality and
//! hashing here ignore the prefix accordingly.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The XML Schema namespace URI.
pub const URI_XSD: &str = "http://www.w3.org/2001/XMLSchema";
/// The XML Schema instance namespace URI (xsi:type, xsi:nil).
pub const URI_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// The XML namespace URI (xml:base, xml:lang, ...).
pub const URI_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified name: URI + local name + optional prefix.
///
/// Die Komponenten sind `Rc<str>`, damit SE/AT-Events denselben QName ohne
/// String-Kopien teilen können (Sessions sind single-threaded).
#[derive(Debug, Clone, Eq)]
pub struct QName {
    /// The namespace URI (empty string = no namespace).
    pub uri: Rc<str>,
    /// The local name.
    pub local_name: Rc<str>,
    /// The prefix, if one was supplied (only meaningful with prefix preservation).
    pub prefix: Option<Rc<str>>,
}

impl QName {
    /// Creates a QName without a prefix.
    pub fn new(uri: &str, local_name: &str) -> Self {
        Self { uri: Rc::from(uri), local_name: Rc::from(local_name), prefix: None }
    }

    /// Creates a QName with a prefix.
    pub fn with_prefix(uri: &str, local_name: &str, prefix: &str) -> Self {
        Self {
            uri: Rc::from(uri),
            local_name: Rc::from(local_name),
            prefix: Some(Rc::from(prefix)),
        }
    }

    /// True if URI and local name match the given pair.
    #[inline]
    pub fn matches(&self, uri: &str, local_name: &str) -> bool {
        &*self.uri == uri && &*self.local_name == local_name
    }

    /// Lexicographic schema order: local name first, then URI (Spec 8.5.4.1.4
    /// sorts attribute uses this way; global elements sort the same way).
    pub fn schema_order(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.local_name == other.local_name
    }
}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec 7.1.7: Gleichheit ignoriert den Prefix.
    #[test]
    fn gleichheit_ignoriert_prefix() {
        let a = QName::new("http://example.org", "item");
        let b = QName::with_prefix("http://example.org", "item", "ex");
        assert_eq!(a, b);
    }

    #[test]
    fn ungleiche_uri() {
        let a = QName::new("http://example.org", "item");
        let b = QName::new("http://other.org", "item");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_konsistent_mit_eq() {
        use std::collections::hash_map::DefaultHasher;
        let a = QName::new("u", "n");
        let b = QName::with_prefix("u", "n", "p");
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn display_mit_und_ohne_namespace() {
        assert_eq!(QName::new("", "root").to_string(), "root");
        assert_eq!(
            QName::new("http://example.org", "root").to_string(),
            "{http://example.org}root"
        );
    }

    /// Spec 8.5.4.1.4: local-name zuerst, dann URI.
    #[test]
    fn schema_order_local_name_zuerst() {
        let a = QName::new("http://z.org", "alpha");
        let b = QName::new("http://a.org", "beta");
        assert_eq!(a.schema_order(&b), Ordering::Less);

        let c = QName::new("http://a.org", "alpha");
        assert_eq!(c.schema_order(&a), Ordering::Less);
    }
}
