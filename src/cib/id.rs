use std::collections::HashSet;

use thiserror::Error;

use super::Element;

/// Upper bound on the numeric suffixes tried before giving up on a candidate.
const MAX_SUFFIX: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdAllocationError {
    #[error("'{candidate}' cannot be turned into a valid id")]
    InvalidCandidate { candidate: String },

    #[error("no unused id is left for '{candidate}'")]
    Exhausted { candidate: String },
}

/// Hands out element ids that are valid and unique within one CIB document.
pub trait IdProvider {
    /// Return an id derived from `candidate` and reserve it so it is never
    /// returned again.
    ///
    /// # Errors
    ///
    /// Returns [`IdAllocationError`] if no valid unused id can be derived.
    fn allocate_id(&mut self, candidate: &str) -> Result<String, IdAllocationError>;
}

/// [`IdProvider`] over a document's existing ids.
///
/// The ids are read once at construction, so the document can be borrowed
/// mutably while ids are being allocated for it.
#[derive(Debug, Clone, Default)]
pub struct DocumentIdProvider {
    taken: HashSet<String>,
}

impl DocumentIdProvider {
    #[must_use]
    pub fn new(document: &Element) -> Self {
        let taken = std::iter::once(document)
            .chain(document.descendants())
            .filter_map(|element| element.attr("id"))
            .map(str::to_owned)
            .collect();
        Self { taken }
    }

    /// Reserve `id` without allocating it. Returns `false` if it was taken.
    pub fn book(&mut self, id: &str) -> bool {
        self.taken.insert(id.to_owned())
    }

    #[must_use]
    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }
}

impl IdProvider for DocumentIdProvider {
    fn allocate_id(&mut self, candidate: &str) -> Result<String, IdAllocationError> {
        let base = sanitize_id(candidate).ok_or_else(|| IdAllocationError::InvalidCandidate {
            candidate: candidate.to_owned(),
        })?;
        let id = if self.taken.contains(&base) {
            (1..=MAX_SUFFIX)
                .map(|n| format!("{base}-{n}"))
                .find(|id| !self.taken.contains(id))
                .ok_or_else(|| IdAllocationError::Exhausted {
                    candidate: candidate.to_owned(),
                })?
        } else {
            base
        };
        tracing::trace!(candidate, id = %id, "allocated id");
        self.taken.insert(id.clone());
        Ok(id)
    }
}

/// Turn `candidate` into a valid XML id.
///
/// Leading characters that cannot start an id are dropped, as are invalid
/// characters elsewhere. Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize_id(candidate: &str) -> Option<String> {
    let rest = candidate.trim_start_matches(|c: char| !is_id_start(c));
    let id: String = rest.chars().filter(|c| is_id_char(*c)).collect();
    (!id.is_empty()).then_some(id)
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_id("rsc-1").as_deref(), Some("rsc-1"));
        assert_eq!(sanitize_id("1-op-monitor").as_deref(), Some("op-monitor"));
        assert_eq!(sanitize_id("-_a b:c").as_deref(), Some("_abc"));
        assert_eq!(sanitize_id("123"), None);
        assert_eq!(sanitize_id(""), None);
    }

    #[test]
    fn uniquifies_against_document_and_itself() {
        let doc = Element::parse(r#"<cib id="cib"><x id="a-rule"/><x id="a-rule-1"/></cib>"#)
            .unwrap();
        let mut ids = DocumentIdProvider::new(&doc);
        assert!(ids.is_taken("cib"));
        assert_eq!(ids.allocate_id("a-rule").unwrap(), "a-rule-2");
        assert_eq!(ids.allocate_id("a-rule").unwrap(), "a-rule-3");
        assert_eq!(ids.allocate_id("fresh").unwrap(), "fresh");
        assert_eq!(ids.allocate_id("fresh").unwrap(), "fresh-1");
    }

    #[test]
    fn booked_ids_are_skipped() {
        let mut ids = DocumentIdProvider::default();
        assert!(ids.book("x"));
        assert!(!ids.book("x"));
        assert_eq!(ids.allocate_id("x").unwrap(), "x-1");
    }

    #[test]
    fn unusable_candidate() {
        let mut ids = DocumentIdProvider::default();
        assert_eq!(
            ids.allocate_id("42"),
            Err(IdAllocationError::InvalidCandidate {
                candidate: "42".into()
            })
        );
    }
}
