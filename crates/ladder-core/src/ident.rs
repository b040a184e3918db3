// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use blake3::Hasher;

/// Canonical 256-bit hash used throughout the runtime for addressing terms.
pub type Hash = [u8; 32];

/// Strongly typed identifier for a term in the store.
///
/// `TermId` is an opaque 32-byte identifier derived deterministically from a
/// term's content via [`make_term_id`]: two terms with identical symbol,
/// scale, and children always share one id (hash-consing). Tooling must not
/// assume ids are reversible back into symbols.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TermId(pub Hash);

impl TermId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Parses an id from its lowercase hex rendering.
    ///
    /// # Errors
    ///
    /// Returns [`IdParseError`] when the input is not exactly 64 hex digits.
    pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
        let bytes = hex::decode(s).map_err(|_| IdParseError(s.to_owned()))?;
        let raw: Hash = bytes.try_into().map_err(|_| IdParseError(s.to_owned()))?;
        Ok(Self(raw))
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Error produced when a hex string does not decode into a [`TermId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid term id: {0:?}")]
pub struct IdParseError(pub String);

impl serde::Serialize for TermId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for TermId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Produces the canonical content-derived identifier for a term.
///
/// The digest is BLAKE3 over a domain-separated canonical encoding: the
/// prefix `b"term:"`, the symbol length (8-byte LE) and bytes, the scale
/// (4-byte LE), and the child count (8-byte LE) followed by each child id's
/// raw 32 bytes in order. Length prefixes keep the encoding unambiguous;
/// changing any of this is a breaking change to snapshot identity.
pub fn make_term_id(symbol: &str, scale: u32, children: &[TermId]) -> TermId {
    let mut hasher = Hasher::new();
    hasher.update(b"term:");
    hasher.update(&(symbol.len() as u64).to_le_bytes());
    hasher.update(symbol.as_bytes());
    hasher.update(&scale.to_le_bytes());
    hasher.update(&(children.len() as u64).to_le_bytes());
    for child in children {
        hasher.update(&child.0);
    }
    TermId(hasher.finalize().into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_yields_identical_ids() {
        let a = make_term_id("atom", 0, &[]);
        let b = make_term_id("atom", 0, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn scale_participates_in_identity() {
        assert_ne!(make_term_id("atom", 0, &[]), make_term_id("atom", 1, &[]));
    }

    #[test]
    fn child_order_participates_in_identity() {
        let x = make_term_id("x", 0, &[]);
        let y = make_term_id("y", 0, &[]);
        assert_ne!(
            make_term_id("pair", 0, &[x, y]),
            make_term_id("pair", 0, &[y, x])
        );
    }

    #[test]
    fn length_prefixes_prevent_symbol_child_ambiguity() {
        // "ab" with no children must not collide with "a" plus crafted bytes.
        assert_ne!(make_term_id("ab", 0, &[]), make_term_id("a", 0, &[]));
    }

    #[test]
    fn hex_round_trip() {
        let id = make_term_id("atom", 2, &[]);
        let parsed = TermId::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
